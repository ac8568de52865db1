//! Course-wide commands: `list-tasks`, `configure` and the shell greeting

use super::Context;
use crate::config::CourseConfig;
use crate::runner::ProcessRunner;
use crate::Result;
use colored::Colorize;
use convenient_task::profile::validate_profile;
use convenient_task::{aggregate, discover, task_directories};
use std::io::Write;
use tracing::info;

/// Print every task directory, one per line
pub fn list<W: Write>(config: &CourseConfig, mut out: W) -> Result<()> {
    for dir in task_directories(&config.course_dir) {
        writeln!(out, "{}", dir.display())?;
    }
    Ok(())
}

/// Configure every profile used anywhere in the course
///
/// All profile names are validated before the first external call.
pub fn configure<R: ProcessRunner, W: Write>(ctx: &Context<'_, R>, out: W) -> Result<bool> {
    let tasks = discover(&ctx.config.course_dir)?;
    let matrix = aggregate(&tasks);
    let profiles = matrix.profiles();

    for profile in &profiles {
        validate_profile(profile)?;
    }

    let mut engine = ctx.orchestrator(out);
    for profile in &profiles {
        let result = engine.configure(profile)?;
        if let Err(failure) = &result {
            engine
                .reporter_mut()
                .error(&format!("Failed to configure profile {}: {}", profile, failure))?;
        }
        engine.reporter_mut().record(*profile, result);
    }

    info!(
        "Configured {} profiles, {} failed",
        profiles.len(),
        engine.failure_count()
    );
    Ok(engine.reporter().all_succeeded())
}

pub fn welcome<W: Write>(mut out: W) -> Result<()> {
    let greeting = "\nWelcome to Parallel and Concurrent Programming course shell!\n\
                    Print 'course-cli --help' to list available commands and 'exit' to quit.\n";
    writeln!(out, "{}", greeting.green().bold())?;
    Ok(())
}
