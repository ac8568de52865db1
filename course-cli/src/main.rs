//! course-cli - Concurrent and Parallel Programming course client

use clap::Parser;
use colored::Colorize;
use course_cli::commands::{self, Cli, Context};
use course_cli::config::CourseConfig;
use course_cli::runner::{OutputMode, SystemRunner};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "course_cli=debug,convenient_task=debug"
    } else {
        "course_cli=warn,convenient_task=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: &Cli) -> course_cli::Result<bool> {
    let config = CourseConfig::from_args(&cli.config)?;
    let current_dir = std::env::current_dir()
        .map_err(|e| course_cli::CliError::Io(".".into(), e))?;
    tracing::debug!("Course directory: {}", config.course_dir.display());

    let mode = if cli.config.capture_output {
        OutputMode::Capture
    } else {
        OutputMode::Inherit
    };
    let ctx = Context::new(&config, SystemRunner::new(mode), current_dir);

    commands::execute(&ctx, &cli.command, io::stderr(), io::stdout())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}", e.to_string().red().bold());
            ExitCode::FAILURE
        }
    }
}
