//! `test`: build and run the current task's test targets

use super::Context;
use crate::engine::RunOptions;
use crate::runner::ProcessRunner;
use crate::sandbox::Sandbox;
use crate::{CliError, Result};
use convenient_task::MatrixFilter;
use std::io::Write;

/// Run every (target, profile) pair of the current task accepted by `profiles`
///
/// Sub-test `filters` are joined with `,` into the single filter argument of the
/// test binary.
pub fn run<R: ProcessRunner, W: Write>(
    ctx: &Context<'_, R>,
    out: W,
    profiles: &[String],
    filters: &[String],
    sandboxed: bool,
) -> Result<bool> {
    if sandboxed && !Sandbox::is_supported() {
        return Err(CliError::SandboxUnsupported);
    }

    let task = ctx.current_task()?;
    let items = task
        .targets
        .resolve(&MatrixFilter::new(Vec::<String>::new(), profiles.iter().cloned()));

    let options = RunOptions {
        sandboxed,
        filter: (!filters.is_empty()).then(|| filters.join(",")),
    };

    let mut engine = ctx.orchestrator(out);
    let failures = engine.run_tests(&items, &options)?;
    Ok(failures == 0)
}
