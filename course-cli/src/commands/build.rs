//! `build`: configure and build selected (target, profile) pairs

use super::Context;
use crate::runner::ProcessRunner;
use crate::Result;
use convenient_task::{MatrixFilter, aggregate, discover};
use std::io::Write;
use tracing::info;

/// Build the pairs of the current task, or of the whole course with `all`
pub fn run<R: ProcessRunner, W: Write>(
    ctx: &Context<'_, R>,
    out: W,
    targets: &[String],
    profiles: &[String],
    all: bool,
) -> Result<bool> {
    let matrix = if all {
        aggregate(&discover(&ctx.config.course_dir)?)
    } else {
        ctx.current_task()?.targets
    };

    let filter = MatrixFilter::new(targets.iter().cloned(), profiles.iter().cloned());
    let items = matrix.resolve(&filter);
    info!("Building {} of {} target/profile pairs", items.len(), matrix.len());

    let mut engine = ctx.orchestrator(out);
    let failures = engine.build_all(&items)?;
    Ok(failures == 0)
}
