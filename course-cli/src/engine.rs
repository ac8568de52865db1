//! Orchestration engine
//!
//! Drives the fixed `configure → build → run` pipeline (or `configure → lint`)
//! over resolved work items. Work items are processed one at a time; every
//! external call blocks until the tool exits.
//!
//! Each profile has one build directory shared by all its targets. Since
//! execution is strictly sequential, at most one configure or build touches a
//! given build directory at any moment. Running work items concurrently would
//! need a per-profile lock around configure+build.
//!
//! Failure policy:
//! - a tool that cannot be started or exits nonzero fails only the current work
//!   item; the next item still runs
//! - an invalid profile name is fatal and stops the command before any tool runs

use crate::config::{ConfigError, CourseConfig};
use crate::report::{Reporter, Stage, StageFailure, StageResult};
use crate::runner::{Invocation, ProcessRunner};
use crate::sandbox::{Sandbox, SandboxSpec};
use convenient_task::profile::validate_profile;
use convenient_task::{TaskError, WorkItem, build_type};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a whole command
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidProfile(#[from] TaskError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Lifecycle of one work item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Configuring,
    Building,
    Running,
    Succeeded,
    Failed(Stage),
}

impl PipelineState {
    /// Terminal state for a finished pipeline
    pub fn from_result(result: &StageResult) -> Self {
        match result {
            Ok(()) => PipelineState::Succeeded,
            Err(failure) => PipelineState::Failed(failure.stage),
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::Configuring => f.write_str("configuring"),
            PipelineState::Building => f.write_str("building"),
            PipelineState::Running => f.write_str("running"),
            PipelineState::Succeeded => f.write_str("succeeded"),
            PipelineState::Failed(stage) => write!(f, "failed at {}", stage),
        }
    }
}

fn validate_profiles(items: &[WorkItem]) -> Result<()> {
    for item in items {
        validate_profile(&item.profile)?;
    }
    Ok(())
}

/// How a test binary is executed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run inside the Bubblewrap sandbox
    pub sandboxed: bool,
    /// Sub-test filter passed to the binary as its only argument
    pub filter: Option<String>,
}

/// Runs pipelines against the course build tree
pub struct Orchestrator<'a, R: ProcessRunner, W: Write> {
    config: &'a CourseConfig,
    runner: R,
    sandbox: Sandbox,
    reporter: Reporter<W>,
}

impl<'a, R: ProcessRunner, W: Write> Orchestrator<'a, R, W> {
    pub fn new(config: &'a CourseConfig, runner: R, reporter: Reporter<W>) -> Self {
        Self {
            config,
            runner,
            sandbox: Sandbox::default(),
            reporter,
        }
    }

    pub fn reporter(&self) -> &Reporter<W> {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut Reporter<W> {
        &mut self.reporter
    }

    pub fn failure_count(&self) -> usize {
        self.reporter.failure_count()
    }

    /// Run one external command, turning a spawn error or nonzero exit into a stage failure
    fn invoke(&mut self, stage: Stage, invocation: Invocation) -> Result<StageResult> {
        debug!("[{}] {}", stage, invocation);
        let output = match self.runner.run(&invocation) {
            Ok(output) => output,
            Err(e) => return Ok(Err(StageFailure::new(stage, e.to_string()))),
        };

        if output.success() {
            return Ok(Ok(()));
        }

        for captured in [&output.stdout, &output.stderr] {
            if !captured.trim().is_empty() {
                self.reporter.plain(captured.trim_end())?;
            }
        }

        Ok(Err(StageFailure::new(
            stage,
            format!("`{}` returned {}", invocation, output.status_text()),
        )))
    }

    /// Create or refresh the build directory of `profile`
    ///
    /// Fails with [`EngineError::InvalidProfile`] before invoking anything if the
    /// profile name cannot be turned into a build type.
    pub fn configure(&mut self, profile: &str) -> Result<StageResult> {
        let build_type = build_type(profile)?;
        let build_dir = self.config.build_dir(profile);

        self.reporter.progress(&format!(
            "Configuring profile {} in build directory {}",
            profile,
            build_dir.display()
        ))?;

        let invocation = Invocation::new("cmake")
            .arg("-S")
            .arg(&self.config.course_dir)
            .arg("-B")
            .arg(&build_dir)
            .arg(format!("-DCMAKE_BUILD_TYPE={}", build_type))
            .arg("-GNinja");

        self.invoke(Stage::Configure, invocation)
    }

    /// Build one target without reconfiguring
    fn build_target(&mut self, item: &WorkItem) -> Result<StageResult> {
        let build_dir = self.config.build_dir(&item.profile);

        self.reporter.progress(&format!(
            "Building target {} in build directory {}",
            item,
            build_dir.display()
        ))?;

        let invocation = Invocation::new("cmake")
            .arg("--build")
            .arg(&build_dir)
            .arg("--target")
            .arg(&item.target);
        if let Err(failure) = self.invoke(Stage::Build, invocation)? {
            return Ok(Err(failure));
        }

        if self.config.splits_debug_symbols() {
            // Symbolizers need the .dSYM bundle next to the binary
            let binary = self.config.binary_path(&item.target, &item.profile);
            return self.invoke(Stage::Build, Invocation::new("dsymutil").arg(binary));
        }

        Ok(Ok(()))
    }

    /// Configure the profile, then build the target
    pub fn build(&mut self, item: &WorkItem) -> Result<StageResult> {
        if let Err(failure) = self.configure(&item.profile)? {
            return Ok(Err(failure));
        }
        self.build_target(item)
    }

    /// Build every item and record one outcome per item
    pub fn build_all(&mut self, items: &[WorkItem]) -> Result<usize> {
        validate_profiles(items)?;
        for item in items {
            let result = self.build(item)?;
            if let Err(failure) = &result {
                self.reporter
                    .error(&format!("Failed to build {}: {}", item, failure))?;
            }
            self.reporter.record(item.to_string(), result);
        }
        Ok(self.reporter.failure_count())
    }

    fn run_binary(&mut self, item: &WorkItem, options: &RunOptions) -> Result<StageResult> {
        self.reporter.progress(&format!("Running test {}", item))?;

        let binary = self.config.binary_path(&item.target, &item.profile);
        let filter = options.filter.as_deref().filter(|f| !f.is_empty());

        let invocation = if options.sandboxed {
            let mut spec = SandboxSpec::new(&binary).read_only(&self.config.toolchain_root);
            for (key, value) in self.config.symbolizer_env()? {
                spec = spec.env(key, value);
            }
            if let Some(filter) = filter {
                spec = spec.arg(filter);
            }
            self.sandbox.invocation(&spec)
        } else {
            let mut invocation = Invocation::new(&binary);
            if let Some(filter) = filter {
                invocation = invocation.arg(filter);
            }
            invocation
        };

        self.invoke(Stage::Run, invocation)
    }

    /// Drive one work item through configure → build → run
    fn test_pipeline(&mut self, item: &WorkItem, options: &RunOptions) -> Result<StageResult> {
        let mut state = PipelineState::Idle;
        let steps = [
            PipelineState::Configuring,
            PipelineState::Building,
            PipelineState::Running,
        ];

        for next in steps {
            debug!("{}: {} -> {}", item, state, next);
            state = next;

            let result = match state {
                PipelineState::Configuring => self.configure(&item.profile)?,
                PipelineState::Building => self.build_target(item)?,
                _ => self.run_binary(item, options)?,
            };

            if result.is_err() {
                debug!("{}: {} -> {}", item, state, PipelineState::from_result(&result));
                return Ok(result);
            }
        }

        debug!("{}: {} -> {}", item, state, PipelineState::Succeeded);
        Ok(Ok(()))
    }

    /// Build and run one test target, framed by start and result banners
    pub fn run_test(&mut self, item: &WorkItem, options: &RunOptions) -> Result<StageResult> {
        self.reporter.start(&format!("Running test {}", item))?;

        let result = self.test_pipeline(item, options)?;
        info!("Test {} {}", item, PipelineState::from_result(&result));

        self.reporter.finish(
            item.to_string(),
            result.clone(),
            &format!("Test {} succeeded", item),
            &format!("Test {} failed", item),
        )?;
        Ok(result)
    }

    /// Run every test item in order and return the failure count
    ///
    /// Profile names, and the symbolizer paths of a sandboxed run, are checked
    /// before the first banner so a fatal error never leaves one unclosed.
    pub fn run_tests(&mut self, items: &[WorkItem], options: &RunOptions) -> Result<usize> {
        validate_profiles(items)?;
        if options.sandboxed {
            self.config.symbolizer_env()?;
        }

        for item in items {
            // The reporter keeps the outcome
            let _outcome = self.run_test(item, options)?;
        }
        let failures = self.reporter.failure_count();
        info!("{} of {} tests failed", failures, items.len());
        Ok(failures)
    }

    /// Lint `files` with the compilation database of `profile`
    ///
    /// One invocation covers every file; `files` are relative to `task_dir`.
    pub fn run_lint(
        &mut self,
        profile: &str,
        task_dir: &Path,
        files: &[PathBuf],
    ) -> Result<StageResult> {
        self.reporter.start(&format!(
            "Running lint check with profile {} for {} files",
            profile,
            files.len()
        ))?;

        let result = match self.configure(profile)? {
            Err(failure) => Err(failure),
            Ok(()) => {
                let invocation = Invocation::new("clang-tidy")
                    .arg("-p")
                    .arg(self.config.build_dir(profile))
                    .arg("--config-file")
                    .arg(self.config.clang_tidy_config())
                    .args(files)
                    .current_dir(task_dir);
                self.invoke(Stage::Lint, invocation)?
            }
        };

        self.reporter.finish(
            format!("lint.{}", profile),
            result.clone(),
            &format!("Lint check with profile {} succeeded", profile),
            &format!("Lint check with profile {} failed", profile),
        )?;
        Ok(result)
    }

    fn format_invocation(&self, task_dir: &Path) -> Invocation {
        Invocation::new("clang-format")
            .arg(format!(
                "--style=file:{}",
                self.config.clang_format_style().display()
            ))
            .current_dir(task_dir)
    }

    /// Check formatting without touching the files
    pub fn run_format_check(&mut self, task_dir: &Path, files: &[PathBuf]) -> Result<StageResult> {
        self.reporter
            .start(&format!("Running format check for {} files", files.len()))?;

        let invocation = self
            .format_invocation(task_dir)
            .arg("--dry-run")
            .arg("-Werror")
            .args(files);
        let result = self.invoke(Stage::Format, invocation)?;

        self.reporter.finish(
            "format",
            result.clone(),
            "Format check succeeded",
            "Format check failed",
        )?;
        Ok(result)
    }

    /// Rewrite files in place; never reports pass or fail
    pub fn run_format_fix(&mut self, task_dir: &Path, files: &[PathBuf]) -> Result<()> {
        self.reporter
            .hint(&format!("Fixing format for {} files", files.len()))?;

        let invocation = self.format_invocation(task_dir).arg("-i").args(files);
        if let Err(failure) = self.invoke(Stage::Format, invocation)? {
            warn!("Format fix did not complete: {}", failure);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{ProcessOutput, RunnerError};
    use std::cell::RefCell;
    use tracing_test::traced_test;

    /// Fails every invocation whose program name matches
    struct FailingOn {
        program: &'static str,
        calls: RefCell<Vec<Invocation>>,
    }

    impl ProcessRunner for FailingOn {
        fn run(&self, invocation: &Invocation) -> std::result::Result<ProcessOutput, RunnerError> {
            self.calls.borrow_mut().push(invocation.clone());
            let code = if invocation.program_name() == self.program { 1 } else { 0 };
            Ok(ProcessOutput::exited(code))
        }
    }

    fn failing_on(program: &'static str) -> FailingOn {
        FailingOn {
            program,
            calls: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_configure_failure_skips_build_and_run() {
        let config = CourseConfig::for_course("/course");
        let runner = failing_on("cmake");
        let mut engine = Orchestrator::new(&config, &runner, Reporter::new(Vec::new()));

        let result = engine
            .run_test(&WorkItem::new("t", "debug"), &RunOptions::default())
            .unwrap();

        assert_eq!(result.unwrap_err().stage, Stage::Configure);
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn test_pipeline_state_from_result() {
        assert_eq!(PipelineState::from_result(&Ok(())), PipelineState::Succeeded);
        let failed = Err(StageFailure::new(Stage::Run, "boom"));
        assert_eq!(
            PipelineState::from_result(&failed),
            PipelineState::Failed(Stage::Run)
        );
        assert_eq!(PipelineState::Failed(Stage::Run).to_string(), "failed at run");
    }

    #[test]
    fn test_invalid_profile_is_fatal() {
        let config = CourseConfig::for_course("/course");
        let runner = failing_on("none");
        let mut engine = Orchestrator::new(&config, &runner, Reporter::new(Vec::new()));

        let err = engine.configure("Debug").unwrap_err();
        assert!(matches!(err, EngineError::InvalidProfile(_)));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_failed_run_is_logged_with_stage() {
        let config = CourseConfig::for_course("/course");
        let runner = failing_on("/course/build/debug/t");
        let mut engine = Orchestrator::new(&config, &runner, Reporter::new(Vec::new()));

        let result = engine
            .run_test(&WorkItem::new("t", "debug"), &RunOptions::default())
            .unwrap();

        assert_eq!(result.unwrap_err().stage, Stage::Run);
        assert_eq!(engine.failure_count(), 1);
        assert!(logs_contain("Test t.debug failed at run"));
        assert!(logs_contain("t.debug: building -> running"));
    }
}
