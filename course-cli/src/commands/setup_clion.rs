//! `setup-clion`: regenerate CLion tools, targets and run configurations

use crate::clion::ClionProject;
use crate::config::CourseConfig;
use crate::report::Reporter;
use crate::Result;
use convenient_task::{aggregate, discover};
use std::io::Write;

pub fn run<W: Write>(config: &CourseConfig, out: W) -> Result<()> {
    // Fails before any file is touched if the project was never opened in CLion
    let project = ClionProject::open(config)?;

    let matrix = aggregate(&discover(&config.course_dir)?);
    project.write_all(&matrix)?;

    Reporter::new(out).progress(&format!(
        "CLion targets updated in {}",
        project.idea_dir().display()
    ))?;
    Ok(())
}
