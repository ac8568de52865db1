//! `format`: check or fix clang-format style of the submitted files

use super::Context;
use crate::Result;
use crate::runner::ProcessRunner;
use std::io::Write;

const FIX_HINT: &str = "Use `course-cli format --fix` to fix format errors";

/// Check mode fails on any style violation; fix mode always succeeds
pub fn run<R: ProcessRunner, W: Write>(ctx: &Context<'_, R>, out: W, fix: bool) -> Result<bool> {
    let task = ctx.current_task()?;
    let mut engine = ctx.orchestrator(out);

    if fix {
        engine.run_format_fix(&task.directory, &task.submit_files)?;
        return Ok(true);
    }

    let result = engine.run_format_check(&task.directory, &task.submit_files)?;
    if result.is_err() {
        engine.reporter_mut().hint(FIX_HINT)?;
    }
    Ok(result.is_ok())
}
