//! `clean`: remove build directories

use crate::config::CourseConfig;
use crate::report::Reporter;
use crate::{CliError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `build/` plus `build-*` directories from the older per-profile layout
fn build_directories(course_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = vec![course_dir.join("build")];

    let entries = fs::read_dir(course_dir).map_err(|e| CliError::Io(course_dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CliError::Io(course_dir.to_path_buf(), e))?;
        let legacy = entry.file_name().to_string_lossy().starts_with("build-");
        if legacy && entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Remove every build directory
///
/// Missing directories are skipped and removal errors are only logged, so
/// cleaning never fails once the course directory could be listed.
pub fn run<W: Write>(config: &CourseConfig, out: W) -> Result<()> {
    let mut reporter = Reporter::new(out);

    for dir in build_directories(&config.course_dir)? {
        match fs::remove_dir_all(&dir) {
            Ok(()) => reporter.progress(&format!("Removed {}", dir.display()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Nothing to remove at {}", dir.display());
            }
            Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
        }
    }

    Ok(())
}
