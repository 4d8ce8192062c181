//! Operator-facing reporting of progress, backend diagnostics and
//! per-file failures.

use std::sync::Mutex;

use yansi::{Paint, Painted};

use crate::error::CompileError;
use crate::sources::SourceFile;
use crate::standard_json::{Diagnostic, Severity};

/// Where the pipeline sends everything an operator should see.
///
/// Implementations must not fail; reporting never stops a compilation.
pub trait Reporter: Send + Sync {
    fn compiling(&self, file: &SourceFile);
    fn warning(&self, file: &SourceFile, message: &str);
    fn error(&self, file: &SourceFile, message: &str);
    fn failed(&self, file: &SourceFile, error: &CompileError);
}

/// Counts of what one backend invocation reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticSummary {
    pub warnings: usize,
    /// Full text of every non-warning diagnostic, in backend order.
    pub errors: Vec<String>,
}

/// Sends each diagnostic to `reporter` as a warning or an error.
///
/// Only severity `"warning"` counts as a warning; anything else the
/// backend reports is treated as an error.
pub fn report_diagnostics(
    reporter: &dyn Reporter,
    file: &SourceFile,
    diagnostics: &[Diagnostic],
) -> DiagnosticSummary {
    let mut summary = DiagnosticSummary::default();
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Warning => {
                reporter.warning(file, diagnostic.text());
                summary.warnings += 1;
            }
            Severity::Error => {
                reporter.error(file, diagnostic.text());
                summary.errors.push(diagnostic.text().to_string());
            }
        }
    }
    summary
}

/// Colored, one line per event, on stderr.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        yansi::whenever(yansi::Condition::TTY_AND_COLOR);
        Self
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn compiling(&self, file: &SourceFile) {
        eprintln!("{} {}...", "Compiling".green().bold(), file.source_name);
    }

    fn warning(&self, file: &SourceFile, message: &str) {
        eprintln!("{}", render("warning".yellow().bold(), file, message));
    }

    fn error(&self, file: &SourceFile, message: &str) {
        eprintln!("{}", render("error".red().bold(), file, message));
    }

    fn failed(&self, file: &SourceFile, error: &CompileError) {
        eprintln!("{}", render("failed".red().bold(), file, &error.to_string()));
    }
}

/// `<label> <source>: <first line>`, further lines of `message` indented
/// below it.
fn render(label: Painted<&str>, file: &SourceFile, message: &str) -> String {
    let mut lines = message.lines();
    let mut out = format!(
        "{label} {}: {}",
        file.source_name,
        lines.next().unwrap_or_default()
    );
    for line in lines {
        out.push_str("\n    ");
        out.push_str(line);
    }
    out
}

/// One event captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Compiling(String),
    Warning(String, String),
    Error(String, String),
    Failed(String, String),
}

/// Keeps every event in memory; handy for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.lock().clone()
    }

    fn push(&self, event: ReportEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ReportEvent>> {
        // A poisoned log is still a usable log.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Reporter for RecordingReporter {
    fn compiling(&self, file: &SourceFile) {
        self.push(ReportEvent::Compiling(file.source_name.clone()));
    }

    fn warning(&self, file: &SourceFile, message: &str) {
        self.push(ReportEvent::Warning(file.source_name.clone(), message.to_string()));
    }

    fn error(&self, file: &SourceFile, message: &str) {
        self.push(ReportEvent::Error(file.source_name.clone(), message.to_string()));
    }

    fn failed(&self, file: &SourceFile, error: &CompileError) {
        self.push(ReportEvent::Failed(file.source_name.clone(), error.to_string()));
    }
}
