//! Course-wide configuration
//!
//! Parsed once at startup from global CLI arguments (with environment variable
//! fallbacks), validated, and then handed by reference to every component.

use clap::Args;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Course directory is not set: pass --course-directory or export COURSE_DIRECTORY")]
    CourseDirectoryUnset,

    #[error("Course directory {0} does not exist or is not a directory")]
    CourseDirectoryMissing(PathBuf),

    #[error("Cannot resolve course directory {0}: {1}")]
    CourseDirectoryUnresolvable(PathBuf, std::io::Error),

    #[error("Host platform identifier must not be empty")]
    EmptySystem,

    #[error("{0} is not set; sandboxed test runs need both sanitizer symbolizer paths")]
    SymbolizerUnset(&'static str),
}

/// Raw settings as they come from the command line or the environment
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Root directory of the course repository
    #[arg(long, global = true, env = "COURSE_DIRECTORY")]
    pub course_directory: Option<PathBuf>,

    /// Host platform identifier (e.g. x86_64-linux, x86_64-darwin)
    #[arg(long, global = true, env = "system", default_value = "x86_64-linux")]
    pub system: String,

    /// Symbolizer used by AddressSanitizer inside the sandbox
    #[arg(long, global = true, env = "ASAN_SYMBOLIZER_PATH")]
    pub asan_symbolizer_path: Option<PathBuf>,

    /// Symbolizer used by ThreadSanitizer inside the sandbox
    #[arg(long, global = true, env = "TSAN_SYMBOLIZER_PATH")]
    pub tsan_symbolizer_path: Option<PathBuf>,

    /// Toolchain root mounted read-only into the sandbox
    #[arg(long, global = true, env = "TOOLCHAIN_ROOT", default_value = "/nix")]
    pub toolchain_root: PathBuf,

    /// Capture tool output and print it only when a stage fails
    #[arg(long, global = true)]
    pub capture_output: bool,
}

/// Validated course configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CourseConfig {
    pub course_dir: PathBuf,
    pub system: String,
    pub asan_symbolizer_path: Option<PathBuf>,
    pub tsan_symbolizer_path: Option<PathBuf>,
    pub toolchain_root: PathBuf,
}

impl CourseConfig {
    /// Validate raw arguments
    ///
    /// The course directory is mandatory. Symbolizer paths are optional here and
    /// only checked when a sandboxed run asks for [`CourseConfig::symbolizer_env`].
    pub fn from_args(args: &ConfigArgs) -> Result<Self, ConfigError> {
        let course_dir = args
            .course_directory
            .clone()
            .ok_or(ConfigError::CourseDirectoryUnset)?;

        if !course_dir.is_dir() {
            return Err(ConfigError::CourseDirectoryMissing(course_dir));
        }
        let course_dir = course_dir
            .canonicalize()
            .map_err(|e| ConfigError::CourseDirectoryUnresolvable(course_dir.clone(), e))?;

        if args.system.trim().is_empty() {
            return Err(ConfigError::EmptySystem);
        }

        Ok(Self {
            course_dir,
            system: args.system.clone(),
            asan_symbolizer_path: args.asan_symbolizer_path.clone(),
            tsan_symbolizer_path: args.tsan_symbolizer_path.clone(),
            toolchain_root: args.toolchain_root.clone(),
        })
    }

    /// Configuration rooted at `course_dir` with default settings, without validation
    pub fn for_course(course_dir: impl Into<PathBuf>) -> Self {
        Self {
            course_dir: course_dir.into(),
            system: "x86_64-linux".to_string(),
            asan_symbolizer_path: Some(PathBuf::from("/usr/bin/llvm-symbolizer")),
            tsan_symbolizer_path: Some(PathBuf::from("/usr/bin/llvm-symbolizer")),
            toolchain_root: PathBuf::from("/nix"),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Root of all build directories
    pub fn build_root(&self) -> PathBuf {
        self.course_dir.join("build")
    }

    /// Build directory shared by every target using `profile`
    pub fn build_dir(&self, profile: &str) -> PathBuf {
        self.build_root().join(profile)
    }

    /// Location of a target binary built with `profile`
    pub fn binary_path(&self, target: &str, profile: &str) -> PathBuf {
        self.build_dir(profile).join(target)
    }

    pub fn clang_tidy_config(&self) -> PathBuf {
        self.course_dir.join(".clang-tidy")
    }

    pub fn clang_format_style(&self) -> PathBuf {
        self.course_dir.join(".clang-format")
    }

    pub fn idea_dir(&self) -> PathBuf {
        self.course_dir.join(".idea")
    }

    /// Whether debug symbols live next to the binary and must be bundled after a build
    pub fn splits_debug_symbols(&self) -> bool {
        self.system.ends_with("-darwin")
    }

    /// Variables visible to sanitizers inside the sandbox
    ///
    /// Fails with [`ConfigError::SymbolizerUnset`] if either path is missing.
    pub fn symbolizer_env(&self) -> Result<Vec<(String, String)>, ConfigError> {
        let entries = [
            ("TSAN_SYMBOLIZER_PATH", &self.tsan_symbolizer_path),
            ("ASAN_SYMBOLIZER_PATH", &self.asan_symbolizer_path),
        ];

        entries
            .into_iter()
            .map(|(name, path)| match path {
                Some(path) => Ok((name.to_string(), path.display().to_string())),
                None => Err(ConfigError::SymbolizerUnset(name)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(course_directory: Option<PathBuf>) -> ConfigArgs {
        ConfigArgs {
            course_directory,
            system: "x86_64-linux".to_string(),
            asan_symbolizer_path: Some(PathBuf::from("/opt/asan-symbolizer")),
            tsan_symbolizer_path: Some(PathBuf::from("/opt/tsan-symbolizer")),
            toolchain_root: PathBuf::from("/nix"),
            capture_output: false,
        }
    }

    #[test]
    fn test_from_args_canonicalizes_course_directory() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("course");
        std::fs::create_dir_all(&nested).unwrap();

        let config =
            CourseConfig::from_args(&args(Some(nested.join("..").join("course")))).unwrap();
        assert_eq!(config.course_dir, nested.canonicalize().unwrap());
    }

    #[test]
    fn test_from_args_requires_course_directory() {
        let err = CourseConfig::from_args(&args(None)).unwrap_err();
        assert!(matches!(err, ConfigError::CourseDirectoryUnset));
        assert!(err.to_string().contains("COURSE_DIRECTORY"));
    }

    #[test]
    fn test_from_args_rejects_missing_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = CourseConfig::from_args(&args(Some(missing.clone()))).unwrap_err();
        assert!(matches!(err, ConfigError::CourseDirectoryMissing(path) if path == missing));
    }

    #[test]
    fn test_from_args_rejects_empty_system() {
        let temp = TempDir::new().unwrap();
        let mut raw = args(Some(temp.path().to_path_buf()));
        raw.system = " ".to_string();
        assert!(matches!(
            CourseConfig::from_args(&raw),
            Err(ConfigError::EmptySystem)
        ));
    }

    #[test]
    fn test_derived_paths() {
        let config = CourseConfig::for_course("/course");
        assert_eq!(config.build_dir("debug"), PathBuf::from("/course/build/debug"));
        assert_eq!(
            config.binary_path("unit_tests", "release"),
            PathBuf::from("/course/build/release/unit_tests")
        );
        assert_eq!(config.clang_format_style(), PathBuf::from("/course/.clang-format"));
    }

    #[test]
    fn test_split_debug_symbols_platform() {
        let config = CourseConfig::for_course("/course");
        assert!(!config.splits_debug_symbols());
        assert!(config.with_system("x86_64-darwin").splits_debug_symbols());
    }

    #[test]
    fn test_symbolizer_env_has_two_entries() {
        let config = CourseConfig::from_args(&args(Some(PathBuf::from("/")))).unwrap();
        let env = config.symbolizer_env().unwrap();
        assert_eq!(
            env,
            vec![
                ("TSAN_SYMBOLIZER_PATH".to_string(), "/opt/tsan-symbolizer".to_string()),
                ("ASAN_SYMBOLIZER_PATH".to_string(), "/opt/asan-symbolizer".to_string()),
            ]
        );
    }

    #[test]
    fn test_symbolizers_optional_until_sandboxed() {
        let mut raw = args(Some(PathBuf::from("/")));
        raw.asan_symbolizer_path = None;

        let config = CourseConfig::from_args(&raw).unwrap();
        assert!(matches!(
            config.symbolizer_env(),
            Err(ConfigError::SymbolizerUnset("ASAN_SYMBOLIZER_PATH"))
        ));
    }
}
