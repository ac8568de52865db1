//! Sandboxed test execution with Bubblewrap
//!
//! The sandbox exposes only:
//! - the toolchain root (read-only)
//! - `/proc`, which sanitizer runtimes need for introspection
//! - the test binary itself (read-only, mounted at `/<name>`)
//!
//! The inherited environment is cleared and only the whitelisted variables
//! (the sanitizer symbolizer paths) are set inside.
//!
//! A failure to set up the sandbox surfaces exactly like a failing test: a
//! nonzero exit of the `bwrap` process.

use crate::runner::Invocation;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Pseudo-filesystem required by memory and thread sanitizers
const PROC_DIR: &str = "/proc";

/// Description of one sandboxed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSpec {
    /// Binary to execute
    pub binary: PathBuf,
    /// Arguments passed to the binary
    pub args: Vec<OsString>,
    /// Host paths mounted read-only at the same location
    pub read_only_binds: Vec<PathBuf>,
    /// The complete environment inside the sandbox
    pub env: Vec<(String, String)>,
}

impl SandboxSpec {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            read_only_binds: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn read_only(mut self, path: impl Into<PathBuf>) -> Self {
        self.read_only_binds.push(path.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Where the binary appears inside the sandbox
    pub fn sandboxed_binary(&self) -> PathBuf {
        let name = self
            .binary
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("test"));
        Path::new("/").join(name)
    }
}

/// Builds `bwrap` command lines
#[derive(Debug, Clone)]
pub struct Sandbox {
    program: PathBuf,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new("bwrap")
    }
}

impl Sandbox {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Whether sandboxing is offered on this host
    pub fn is_supported() -> bool {
        cfg!(target_os = "linux")
    }

    /// Translate a [`SandboxSpec`] into the `bwrap` invocation
    pub fn invocation(&self, spec: &SandboxSpec) -> Invocation {
        let mut cmd = Invocation::new(&self.program).arg("--die-with-parent");

        for path in &spec.read_only_binds {
            cmd = cmd.arg("--ro-bind").arg(path).arg(path);
        }
        cmd = cmd.arg("--ro-bind").arg(PROC_DIR).arg(PROC_DIR);

        let inner_binary = spec.sandboxed_binary();
        cmd = cmd
            .arg("--ro-bind")
            .arg(&spec.binary)
            .arg(&inner_binary)
            .arg("--chdir")
            .arg("/");

        // Start with empty environment
        cmd = cmd.arg("--clearenv");
        for (key, value) in &spec.env {
            cmd = cmd.arg("--setenv").arg(key).arg(value);
        }

        tracing::debug!(
            "Sandboxing {} with {} read-only binds",
            spec.binary.display(),
            spec.read_only_binds.len()
        );
        cmd.arg(&inner_binary).args(&spec.args)
    }
}
