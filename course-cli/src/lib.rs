//! Course client library
//!
//! Drives build, test, lint and format workflows over the course task matrix:
//! - [`config`]: process-wide settings, parsed once at startup
//! - [`runner`]: the single seam for external commands
//! - [`sandbox`]: Bubblewrap command lines for isolated test runs
//! - [`engine`]: the configure → build → run pipeline over work items
//! - [`report`]: banners and outcome accumulation
//! - [`clion`]: CLion project files generated from the global matrix
//! - [`commands`]: the clap command surface

pub mod clion;
pub mod commands;
pub mod config;
pub mod engine;
pub mod report;
pub mod runner;
pub mod sandbox;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a command with exit code 1
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Task(#[from] convenient_task::TaskError),

    #[error(transparent)]
    Engine(#[from] engine::EngineError),

    #[error(transparent)]
    Clion(#[from] clion::ClionError),

    #[error("Current directory does not contain a task!\nUse list-tasks command to list all available tasks.")]
    MissingTask(PathBuf),

    #[error("Sandboxed test runs are only supported on Linux")]
    SandboxUnsupported,

    #[error("IO error on {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
