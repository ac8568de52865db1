//! Discovering every task of a course tree

use crate::manifest::{MANIFEST_FILE_NAME, TaskManifest};
use crate::matrix::Matrix;
use crate::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every directory under `root` that holds a manifest, sorted and without duplicates
pub fn task_directories(root: impl AsRef<Path>) -> Vec<PathBuf> {
    let directories: BTreeSet<PathBuf> = WalkDir::new(root.as_ref())
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE_NAME)
        .filter_map(|entry| entry.path().parent().map(Path::to_path_buf))
        .collect();

    directories.into_iter().collect()
}

/// Load every task manifest under `root`
///
/// # Errors
///
/// Fails on the first manifest that cannot be read or parsed.
pub fn discover(root: impl AsRef<Path>) -> Result<Vec<TaskManifest>> {
    let tasks = task_directories(root)
        .into_iter()
        .map(TaskManifest::load)
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!("Discovered {} tasks", tasks.len());
    Ok(tasks)
}

/// Union the target matrices of all tasks into one global matrix
pub fn aggregate<'a>(tasks: impl IntoIterator<Item = &'a TaskManifest>) -> Matrix {
    let mut matrix = Matrix::new();
    for task in tasks {
        matrix.merge(&task.targets);
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_task(root: &Path, relative: &str, yaml: &str) {
        let dir = root.join(relative);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE_NAME), yaml).unwrap();
    }

    #[test]
    fn test_task_directories_nested() {
        let temp = TempDir::new().unwrap();
        write_task(temp.path(), "spinlock", "targets: {}\nsubmit_files: []\n");
        write_task(temp.path(), "memory-models/spsc-queue", "targets: {}\nsubmit_files: []\n");
        fs::create_dir_all(temp.path().join("no-task")).unwrap();

        let dirs = task_directories(temp.path());
        assert_eq!(
            dirs,
            vec![
                temp.path().join("memory-models/spsc-queue"),
                temp.path().join("spinlock"),
            ]
        );
    }

    #[test]
    fn test_aggregate_merges_shared_targets() {
        let temp = TempDir::new().unwrap();
        write_task(
            temp.path(),
            "a",
            "targets:\n  shared:\n    profiles: [debug]\nsubmit_files: []\n",
        );
        write_task(
            temp.path(),
            "b",
            "targets:\n  shared:\n    profiles: [release]\n  only_b:\n    profiles: [debug]\nsubmit_files: []\n",
        );

        let tasks = discover(temp.path()).unwrap();
        let matrix = aggregate(&tasks);

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.profiles_of("shared").unwrap().len(), 2);
        assert!(matrix.profiles_of("only_b").is_some());
    }

    #[test]
    fn test_discover_reports_malformed_manifest() {
        let temp = TempDir::new().unwrap();
        write_task(temp.path(), "broken", "targets: {}\n");
        assert!(discover(temp.path()).is_err());
    }
}
