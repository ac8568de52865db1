//! Course client command-line interface
//!
//! Commands acting on "the current task" require the working directory to hold a
//! `.task.yml` manifest. Commands acting on the whole course (`configure`,
//! `build --all`, `setup-clion`, `list-tasks`, `clean`) work from anywhere.

use crate::config::{ConfigArgs, CourseConfig};
use crate::engine::Orchestrator;
use crate::report::Reporter;
use crate::runner::ProcessRunner;
use crate::{CliError, Result};
use clap::{Parser, Subcommand};
use convenient_task::TaskManifest;
use std::io::Write;
use std::path::PathBuf;

pub mod build;
pub mod clean;
pub mod format;
pub mod lint;
pub mod setup_clion;
pub mod tasks;
pub mod test;

/// Concurrent and Parallel Programming course client
#[derive(Debug, Parser)]
#[command(name = "course-cli")]
#[command(about = "Concurrent and Parallel Programming course client")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run task tests from the current directory
    Test {
        /// Profiles to use (repeatable)
        #[arg(short = 'p', long = "profile")]
        profiles: Vec<String>,

        /// Tests to run, wildcards allowed, e.g. -f 'Test*' -f EdgeCase (repeatable)
        #[arg(short = 'f', long = "filter")]
        filters: Vec<String>,

        /// Run tests in an isolated environment (only for Linux)
        #[arg(long)]
        sandbox: bool,
    },

    /// Run clang-tidy checks
    Lint,

    /// Run clang-format checks
    Format {
        /// Fix format errors
        #[arg(long)]
        fix: bool,
    },

    /// Remove build files
    Clean,

    /// List all available course tasks
    ListTasks,

    /// Configure all profiles
    Configure,

    /// Build task executable(s)
    Build {
        /// Profiles to compile (repeatable)
        #[arg(short = 'p', long = "profile")]
        profiles: Vec<String>,

        /// Targets to compile (repeatable)
        #[arg(short = 't', long = "target")]
        targets: Vec<String>,

        /// Build all tasks
        #[arg(long)]
        all: bool,
    },

    /// Setup CLion targets
    SetupClion,

    #[command(hide = true)]
    Welcome,
}

/// Everything a command needs besides its own arguments
pub struct Context<'a, R: ProcessRunner> {
    pub config: &'a CourseConfig,
    pub runner: R,
    /// Directory the client was started from
    pub current_dir: PathBuf,
}

impl<'a, R: ProcessRunner> Context<'a, R> {
    pub fn new(config: &'a CourseConfig, runner: R, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            runner,
            current_dir: current_dir.into(),
        }
    }

    /// Manifest of the task in the current directory
    pub fn current_task(&self) -> Result<TaskManifest> {
        if !TaskManifest::exists(&self.current_dir) {
            return Err(CliError::MissingTask(self.current_dir.clone()));
        }
        Ok(TaskManifest::load(&self.current_dir)?)
    }

    /// Engine borrowing this context's runner, reporting to `out`
    pub fn orchestrator<W: Write>(&self, out: W) -> Orchestrator<'a, &R, W> {
        Orchestrator::new(self.config, &self.runner, Reporter::new(out))
    }
}

/// Dispatch one parsed command
///
/// `out` receives banners and progress, `listing` receives machine-readable
/// output (`list-tasks`). Returns whether the command succeeded.
pub fn execute<R, W, L>(ctx: &Context<'_, R>, command: &Commands, out: W, listing: L) -> Result<bool>
where
    R: ProcessRunner,
    W: Write,
    L: Write,
{
    match command {
        Commands::Test {
            profiles,
            filters,
            sandbox,
        } => test::run(ctx, out, profiles, filters, *sandbox),
        Commands::Lint => lint::run(ctx, out),
        Commands::Format { fix } => format::run(ctx, out, *fix),
        Commands::Clean => clean::run(ctx.config, out).map(|()| true),
        Commands::ListTasks => tasks::list(ctx.config, listing).map(|()| true),
        Commands::Configure => tasks::configure(ctx, out),
        Commands::Build {
            profiles,
            targets,
            all,
        } => build::run(ctx, out, targets, profiles, *all),
        Commands::SetupClion => setup_clion::run(ctx.config, out).map(|()| true),
        Commands::Welcome => tasks::welcome(out).map(|()| true),
    }
}
