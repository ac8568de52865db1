//! Shared fixtures for command tests

#![allow(dead_code)]

use convenient_task::MANIFEST_FILE_NAME;
use course_cli::config::CourseConfig;
use course_cli::runner::{Invocation, ProcessOutput, ProcessRunner, RunnerError};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const UNIT_TESTS: &str = r#"
targets:
  unit_tests:
    profiles: [debug, release]
submit_files:
  - mutex.hpp
  - mutex.cpp
"#;

type Matcher = Box<dyn Fn(&Invocation) -> bool>;

/// Records every invocation and answers with scripted exit codes
///
/// Invocations matching no rule exit with 0.
#[derive(Default)]
pub struct FakeRunner {
    rules: Vec<(Matcher, i32)>,
    calls: RefCell<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_with(mut self, code: i32, matcher: impl Fn(&Invocation) -> bool + 'static) -> Self {
        self.rules.push((Box::new(matcher), code));
        self
    }

    /// Fail every call of `program`
    pub fn fail_program(self, program: &'static str) -> Self {
        self.exit_with(1, move |inv| inv.program_name() == program)
    }

    /// Fail direct runs of a binary whose path ends with `suffix`, e.g. `debug/unit_tests`
    pub fn fail_binary(self, suffix: &'static str) -> Self {
        self.exit_with(1, move |inv| Path::new(&inv.program).ends_with(suffix))
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::program_name).collect()
    }

    /// Calls whose program is `program`
    pub fn calls_of(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|inv| inv.program_name() == program)
            .cloned()
            .collect()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError> {
        self.calls.borrow_mut().push(invocation.clone());
        let code = self
            .rules
            .iter()
            .find(|(matcher, _)| matcher(invocation))
            .map_or(0, |(_, code)| *code);
        Ok(ProcessOutput::exited(code))
    }
}

/// A course checkout in a temporary directory
pub struct Course {
    pub temp: TempDir,
    pub config: CourseConfig,
}

impl Course {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = CourseConfig::for_course(temp.path());
        Self { temp, config }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Create a task directory with a manifest
    pub fn add_task(&self, relative: &str, manifest: &str) -> PathBuf {
        let dir = self.root().join(relative);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE_NAME), manifest).unwrap();
        dir
    }
}

/// Everything written to a reporter buffer, as text
pub fn text(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer).into_owned()
}
