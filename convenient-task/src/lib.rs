//! Course task manifests and the target/profile matrix
//!
//! Every exercise ("task") of the course lives in its own directory holding a
//! `.task.yml` manifest. The manifest declares which build targets the task has,
//! which compiler profiles each target is built with, and which files are
//! submitted (and therefore linted and formatted).
//!
//! This crate provides:
//! - [`TaskManifest`]: loading and validating a single manifest
//! - [`discover`] / [`aggregate`]: walking a course tree and merging every manifest
//!   into one global [`Matrix`]
//! - [`Matrix::resolve`]: turning a matrix plus optional filters into the exact
//!   list of [`WorkItem`]s to act on
//! - [`profile`]: profile naming rules and build-type derivation
//!
//! ```no_run
//! use convenient_task::{MatrixFilter, TaskManifest};
//!
//! # fn example() -> Result<(), convenient_task::TaskError> {
//! let task = TaskManifest::load("tasks/spinlock")?;
//! let filter = MatrixFilter::default().with_profile("debug");
//! for item in task.targets.resolve(&filter) {
//!     println!("{item}");
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod discovery;
pub mod manifest;
pub mod matrix;
pub mod profile;

pub use discovery::{aggregate, discover, task_directories};
pub use manifest::{MANIFEST_FILE_NAME, TargetSpec, TaskManifest};
pub use matrix::{Matrix, MatrixFilter, WorkItem};
pub use profile::build_type;

/// Task manifest error types
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The directory has no manifest file
    #[error("No task manifest found in {0}")]
    MissingManifest(PathBuf),

    /// File system I/O error
    #[error("IO error reading {0}: {1}")]
    Io(PathBuf, String),

    /// Required keys are absent or have the wrong shape
    #[error("Malformed task manifest {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Profile name that cannot be turned into a build type
    #[error("Invalid profile name {0:?}: only lowercase letters, digits and '-' are allowed")]
    InvalidProfile(String),
}

pub type Result<T> = std::result::Result<T, TaskError>;
