//! Parsing with the optional environment unset
//!
//! Kept in its own test binary with a single test because it mutates the
//! process environment.

use clap::Parser;
use course_cli::commands::{Cli, Commands};
use course_cli::config::{ConfigError, CourseConfig};
use tempfile::TempDir;

#[test]
fn test_parse_without_course_environment() {
    // SAFETY: this is the only test in this binary, so no other thread reads the environment
    unsafe {
        std::env::remove_var("ASAN_SYMBOLIZER_PATH");
        std::env::remove_var("TSAN_SYMBOLIZER_PATH");
        std::env::remove_var("COURSE_DIRECTORY");
    }

    let temp = TempDir::new().unwrap();
    let dir = temp.path().to_str().unwrap();

    let cli = Cli::try_parse_from(["course-cli", "--course-directory", dir, "list-tasks"]).unwrap();
    assert!(matches!(cli.command, Commands::ListTasks));
    assert_eq!(cli.config.asan_symbolizer_path, None);
    assert_eq!(cli.config.tsan_symbolizer_path, None);

    let config = CourseConfig::from_args(&cli.config).unwrap();
    assert!(matches!(
        config.symbolizer_env(),
        Err(ConfigError::SymbolizerUnset(_))
    ));

    let cli = Cli::try_parse_from(["course-cli", "list-tasks"]).unwrap();
    assert!(matches!(
        CourseConfig::from_args(&cli.config),
        Err(ConfigError::CourseDirectoryUnset)
    ));
}
