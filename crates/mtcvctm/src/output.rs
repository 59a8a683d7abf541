//! Styled progress reporting for `mtcvctm` commands.
//!
//! All lines are written to stderr.

use std::fmt::Display;
use std::path::Path;

use console::{Style, Term};

/// Progress reporter for conversions.
pub(crate) struct Output {
    term: Term,
    written: Style,
    partial: Style,
    failed: Style,
    summary: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            written: Style::new().green(),
            partial: Style::new().yellow(),
            failed: Style::new().red(),
            summary: Style::new().cyan().bold(),
        }
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }

    /// Plain progress line.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// `Label: value` line for an effective setting.
    pub(crate) fn setting(&self, label: &str, value: impl Display) {
        self.info(&format!("{label}: {value}"));
    }

    /// A generated file, optionally tagged with its format.
    pub(crate) fn written(&self, format: Option<&str>, path: &Path) {
        self.line(&self.written, &written_line(format, path));
    }

    /// A format that failed while the rest of the document converted.
    pub(crate) fn format_failed(&self, format: &str, error: &dyn Display) {
        self.line(&self.partial, &format!("  !! {format}: {error}"));
    }

    /// A document that produced no output.
    pub(crate) fn document_failed(&self, source: &Path, error: &dyn Display) {
        self.line(&self.failed, &format!("Failed {}: {error}", source.display()));
    }

    /// A non-fatal notice such as an ignored flag.
    pub(crate) fn notice(&self, msg: &str) {
        self.line(&self.partial, msg);
    }

    /// Fatal error line.
    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.failed, msg);
    }

    /// Closing summary of a batch run.
    pub(crate) fn registry_summary(&self, credentials: usize, manifest: &Path) {
        self.line(&self.summary, &format!("\nGenerated registry with {credentials} credential(s)"));
        self.setting("Registry", manifest.display());
    }
}

fn written_line(format: Option<&str>, path: &Path) -> String {
    match format {
        Some(format) => format!("  {format} -> {}", path.display()),
        None => format!("  -> {}", path.display()),
    }
}
