//! External process execution
//!
//! Every toolchain call (cmake, dsymutil, clang-tidy, clang-format, bwrap, the
//! test binaries themselves) goes through [`ProcessRunner`], so the orchestration
//! logic can be exercised with a scripted fake.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Variables added on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Arguments as lossy UTF-8, for matching and display
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human-readable exit status
    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {}", code),
            None => "termination by signal".to_string(),
        }
    }
}

/// Capability to execute an external command and wait for it
pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError> {
        (**self).run(invocation)
    }
}

/// What happens to the child's stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Stream to the terminal as the tool runs
    #[default]
    Inherit,
    /// Collect into [`ProcessOutput`]
    Capture,
}

/// Runs commands with `std::process::Command`, blocking until they exit
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    mode: OutputMode,
}

impl SystemRunner {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError> {
        debug!("Executing: {}", invocation);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&invocation.env);
        cmd.stdin(Stdio::inherit());

        let spawn_error = |source| RunnerError::Spawn {
            program: invocation.program_name(),
            source,
        };

        let output = match self.mode {
            OutputMode::Inherit => {
                let status = cmd.status().map_err(spawn_error)?;
                ProcessOutput {
                    code: status.code(),
                    ..Default::default()
                }
            }
            OutputMode::Capture => {
                let output = cmd.output().map_err(spawn_error)?;
                ProcessOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                }
            }
        };

        debug!("`{}` finished with {}", invocation.program_name(), output.status_text());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display_quotes_whitespace() {
        let inv = Invocation::new("clang-format")
            .arg("-i")
            .arg("my file.cpp");
        assert_eq!(inv.to_string(), "clang-format -i 'my file.cpp'");
    }

    #[test]
    fn test_status_text() {
        assert_eq!(ProcessOutput::exited(3).status_text(), "exit status 3");
        assert_eq!(ProcessOutput::default().status_text(), "termination by signal");
        assert!(ProcessOutput::exited(0).success());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output() {
        let runner = SystemRunner::new(OutputMode::Capture);
        let output = runner
            .run(&Invocation::new("sh").arg("-c").arg("echo out; echo err >&2; exit 4"))
            .unwrap();
        assert_eq!(output.code, Some(4));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_passes_env_and_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = SystemRunner::new(OutputMode::Capture);
        let output = runner
            .run(
                &Invocation::new("sh")
                    .arg("-c")
                    .arg("echo $COURSE_TEST_VALUE; pwd")
                    .current_dir(temp.path())
                    .env("COURSE_TEST_VALUE", "42"),
            )
            .unwrap();
        let lines: Vec<_> = output.stdout.lines().collect();
        assert_eq!(lines[0], "42");
        assert_eq!(
            std::path::Path::new(lines[1]).canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_system_runner_spawn_failure() {
        let runner = SystemRunner::default();
        let err = runner
            .run(&Invocation::new("definitely-not-a-real-program-4711"))
            .unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-real-program-4711"));
    }
}
