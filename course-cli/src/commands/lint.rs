//! `lint`: clang-tidy over the submitted files, once per profile

use super::Context;
use crate::Result;
use crate::runner::ProcessRunner;
use convenient_task::profile::validate_profile;
use std::io::Write;

pub fn run<R: ProcessRunner, W: Write>(ctx: &Context<'_, R>, out: W) -> Result<bool> {
    let task = ctx.current_task()?;
    let profiles = task.profiles();
    for profile in &profiles {
        validate_profile(profile)?;
    }

    let mut engine = ctx.orchestrator(out);
    for profile in profiles {
        let _outcome = engine.run_lint(profile, &task.directory, &task.submit_files)?;
    }

    Ok(engine.reporter().all_succeeded())
}
