//! Loading a single task manifest (`.task.yml`)

use crate::matrix::{Matrix, WorkItem};
use crate::{Result, TaskError};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Name of the manifest file inside every task directory
pub const MANIFEST_FILE_NAME: &str = ".task.yml";

/// Per-target section of the manifest
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TargetSpec {
    /// Profiles this target is built and tested with
    pub profiles: BTreeSet<String>,
}

/// On-disk shape of `.task.yml`; every key is required
#[derive(Debug, Clone, Deserialize, PartialEq)]
struct ManifestFile {
    #[serde(alias = "cmake_targets")]
    targets: BTreeMap<String, TargetSpec>,
    submit_files: Vec<PathBuf>,
}

/// A parsed task, identified by the directory that holds its manifest
#[derive(Debug, Clone, PartialEq)]
pub struct TaskManifest {
    /// Task directory
    pub directory: PathBuf,
    /// Target → profile set
    pub targets: Matrix,
    /// Files under lint and format scope, relative to the task directory
    pub submit_files: Vec<PathBuf>,
}

impl TaskManifest {
    /// Path of the manifest file for a task directory
    pub fn manifest_path(directory: impl AsRef<Path>) -> PathBuf {
        directory.as_ref().join(MANIFEST_FILE_NAME)
    }

    /// Whether `directory` contains a manifest
    pub fn exists(directory: impl AsRef<Path>) -> bool {
        Self::manifest_path(directory).is_file()
    }

    /// Load and validate the manifest of a task directory
    ///
    /// # Errors
    ///
    /// - [`TaskError::MissingManifest`] if the directory has no manifest
    /// - [`TaskError::Io`] if the file cannot be read
    /// - [`TaskError::Malformed`] if `targets` or `submit_files` is absent or malformed
    pub fn load(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        let path = Self::manifest_path(directory);

        if !path.is_file() {
            return Err(TaskError::MissingManifest(directory.to_path_buf()));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| TaskError::Io(path.clone(), e.to_string()))?;

        let manifest = Self::parse(directory, &path, &content)?;
        tracing::debug!(
            "Loaded task {} with {} targets and {} submit files",
            directory.display(),
            manifest.targets.targets().count(),
            manifest.submit_files.len()
        );
        Ok(manifest)
    }

    /// Parse manifest content that belongs to `directory`
    pub fn from_yaml(directory: impl AsRef<Path>, content: &str) -> Result<Self> {
        let directory = directory.as_ref();
        Self::parse(directory, &Self::manifest_path(directory), content)
    }

    fn parse(directory: &Path, path: &Path, content: &str) -> Result<Self> {
        let file: ManifestFile =
            serde_yaml::from_str(content).map_err(|e| TaskError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let targets = file
            .targets
            .into_iter()
            .map(|(target, spec)| (target, spec.profiles))
            .collect();

        Ok(Self {
            directory: directory.to_path_buf(),
            targets,
            submit_files: file.submit_files,
        })
    }

    /// Every distinct profile used by this task
    pub fn profiles(&self) -> BTreeSet<&str> {
        self.targets.profiles()
    }

    /// Full target × profile product of this task
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.targets.resolve(&Default::default())
    }
}
