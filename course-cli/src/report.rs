//! Outcome accumulation and user-facing framing
//!
//! Every work item gets a yellow "start" banner before its pipeline runs and a
//! green or red banner afterwards. The failing tool's error text is printed just
//! above the failure banner. The final verdict of a command is "all succeeded"
//! iff no recorded outcome failed.

use colored::Colorize;
use std::fmt;
use std::io::{self, Write};

/// Width of the `=` separator lines
pub const SEPARATOR_WIDTH: usize = 79;

/// Pipeline stage that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Configure,
    Build,
    Run,
    Lint,
    Format,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configure => "configure",
            Stage::Build => "build",
            Stage::Run => "run",
            Stage::Lint => "lint",
            Stage::Format => "format",
        };
        f.write_str(name)
    }
}

/// Recoverable failure of one stage of one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    /// Failing command and its error text
    pub description: String,
}

impl StageFailure {
    pub fn new(stage: Stage, description: impl Into<String>) -> Self {
        Self {
            stage,
            description: description.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.description)
    }
}

/// Result of a stage or a whole pipeline
pub type StageResult = std::result::Result<(), StageFailure>;

/// Recorded result of one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub label: String,
    pub result: StageResult,
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        self.result.as_ref().err().map(|failure| failure.stage)
    }
}

/// Accumulates outcomes and writes framed notices
pub struct Reporter<W: Write> {
    out: W,
    outcomes: Vec<Outcome>,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            outcomes: Vec::new(),
        }
    }

    fn separator(&mut self, color: &str) -> io::Result<()> {
        let line = "=".repeat(SEPARATOR_WIDTH);
        writeln!(self.out, "{}", line.color(color).bold())
    }

    fn framed(&mut self, text: &str, color: &str) -> io::Result<()> {
        self.separator(color)?;
        writeln!(self.out, "{}", text.color(color).bold())?;
        self.separator(color)
    }

    /// Banner shown before a pipeline begins
    pub fn start(&mut self, text: &str) -> io::Result<()> {
        self.framed(text, "yellow")
    }

    /// Record an outcome and show its success or failure banner
    pub fn finish(
        &mut self,
        label: impl Into<String>,
        result: StageResult,
        success_text: &str,
        failure_text: &str,
    ) -> io::Result<()> {
        match &result {
            Ok(()) => {
                self.framed(success_text, "green")?;
            }
            Err(failure) => {
                writeln!(self.out, "{}", failure)?;
                self.framed(failure_text, "red")?;
            }
        }
        writeln!(self.out)?;
        self.record(label, result);
        Ok(())
    }

    /// Record an outcome without framing
    pub fn record(&mut self, label: impl Into<String>, result: StageResult) {
        let outcome = Outcome {
            label: label.into(),
            result,
        };
        if let Err(failure) = &outcome.result {
            tracing::debug!("{} failed at {} stage", outcome.label, failure.stage);
        }
        self.outcomes.push(outcome);
    }

    /// Cyan progress line
    pub fn progress(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text.cyan())
    }

    /// Bold yellow hint
    pub fn hint(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text.yellow().bold())
    }

    /// Bold red error line
    pub fn error(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text.red().bold())
    }

    /// Plain text, e.g. captured tool output
    pub fn plain(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }

    /// Vacuously true when nothing was recorded
    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
