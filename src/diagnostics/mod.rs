//! Diagnostics for the ABC front end
//!
//! Every stage of the pipeline (scanner, parser, semantic analysis,
//! context interpretation) accumulates diagnostics in a shared reporter
//! instead of raising control-flow errors for recoverable conditions.
//! A diagnostic records the offending source location so hosts can derive
//! a 1-based line/column display and a caret pointer.

use serde::{Deserialize, Serialize};

/// Severity level for diagnostic marks
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// A diagnostic mark highlighting an issue at a specific location
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DiagnosticMark {
    /// 1-based line in the source
    pub line: usize,
    /// 1-based column within the line
    pub column: usize,
    /// Length of the highlight in characters (default 1)
    pub len: usize,
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Kind identifier (e.g., "unterminated_chord", "bad_stem_direction")
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Id of the offending token or node, when one exists
    pub subject_id: Option<u32>,
}

impl DiagnosticMark {
    pub fn new(
        line: usize,
        column: usize,
        severity: DiagnosticSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line,
            column,
            len: 1,
            severity,
            kind: kind.into(),
            message: message.into(),
            subject_id: None,
        }
    }

    /// Create with custom length (for range highlights)
    pub fn with_len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// Attach the offending token/node id
    pub fn with_subject(mut self, id: u32) -> Self {
        self.subject_id = Some(id);
        self
    }

    /// Render the offending source line with a caret pointer underneath.
    ///
    /// Returns `None` when the line index is out of range for the given
    /// source text.
    pub fn render_caret(&self, source: &str) -> Option<String> {
        let line_text = source.lines().nth(self.line.saturating_sub(1))?;
        let mut out = String::new();
        out.push_str(line_text);
        out.push('\n');
        for _ in 1..self.column {
            out.push(' ');
        }
        for _ in 0..self.len.max(1) {
            out.push('^');
        }
        out.push(' ');
        out.push_str(&self.message);
        Some(out)
    }
}

/// Ordered collection of diagnostic marks for one parse
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Diagnostics {
    /// All diagnostic marks, in the order they were reported
    pub marks: Vec<DiagnosticMark>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { marks: Vec::new() }
    }

    /// Add a mark
    pub fn add(&mut self, mark: DiagnosticMark) {
        log::debug!(
            "diagnostic [{:?}] {}:{} {}",
            mark.severity,
            mark.line,
            mark.column,
            mark.message
        );
        self.marks.push(mark);
    }

    /// Extend with multiple marks
    pub fn extend(&mut self, marks: impl IntoIterator<Item = DiagnosticMark>) {
        self.marks.extend(marks);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.marks
            .iter()
            .any(|m| m.severity == DiagnosticSeverity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// Marks at error severity only
    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticMark> {
        self.marks
            .iter()
            .filter(|m| m.severity == DiagnosticSeverity::Error)
    }
}
