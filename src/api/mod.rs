//! Host-facing contracts: check, format, transpose
//!
//! These are the entry points a CLI or editor host calls. Each one runs
//! the whole pipeline on a fresh compilation context; nothing is shared
//! between calls, so concurrent checks of different documents are safe.

use serde::{Deserialize, Serialize};

use crate::analysis::analyze_document;
use crate::context::{interpret, DocumentSnapshots};
use crate::diagnostics::DiagnosticMark;
use crate::error::AbcError;
use crate::format;
use crate::models::ast::FileStructure;
use crate::models::AbcContext;
use crate::parse::{parse, scan};

/// Result of a `check` call
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CheckResult {
    pub has_errors: bool,
    pub diagnostics: Vec<DiagnosticMark>,
}

impl CheckResult {
    /// Diagnostics as a JSON array, for editor/LSP hosts
    pub fn to_json(&self) -> Result<String, AbcError> {
        serde_json::to_string(&self.diagnostics).map_err(AbcError::from)
    }
}

/// Parsed document plus everything derived from it, for hosts that want
/// more than a pass/fail answer
pub struct Parsed {
    pub file: FileStructure,
    pub snapshots: DocumentSnapshots,
    pub context: AbcContext,
}

/// Run the full pipeline: scan, parse, analyze, interpret.
pub fn parse_document(source: &str) -> Parsed {
    let mut ctx = AbcContext::new();
    let tokens = scan(source, &mut ctx);
    let file = parse(tokens, &mut ctx);
    let model = analyze_document(&file, &mut ctx);
    let snapshots = interpret(&file, &model, &mut ctx);
    Parsed {
        file,
        snapshots,
        context: ctx,
    }
}

/// Parse and report: does this document have errors, and which?
pub fn check(source: &str) -> CheckResult {
    let parsed = parse_document(source);
    let has_errors = parsed.context.reporter.has_errors() || parsed.file.has_error_nodes();
    CheckResult {
        has_errors,
        diagnostics: parsed.context.reporter.marks,
    }
}

/// Canonical formatting. Refuses documents that fail `check`: a tree
/// with error nodes would format garbage confidently.
pub fn format(source: &str) -> Result<String, AbcError> {
    let parsed = parse_document(source);
    let errors = parsed.context.reporter.errors().count();
    if errors > 0 || parsed.file.has_error_nodes() {
        return Err(AbcError::DocumentHasErrors(errors.max(1)));
    }
    Ok(format::format(&parsed.file))
}

/// Transpose by semitones within an optional encoded-position range and
/// re-stringify losslessly.
pub fn transpose(
    source: &str,
    semitones: i32,
    range: Option<(u64, u64)>,
) -> Result<String, AbcError> {
    let mut parsed = parse_document(source);
    let errors = parsed.context.reporter.errors().count();
    if errors > 0 || parsed.file.has_error_nodes() {
        return Err(AbcError::DocumentHasErrors(errors.max(1)));
    }
    crate::transposition::transpose_file(&mut parsed.file, semitones, range, &mut parsed.context)?;
    Ok(format::stringify(&parsed.file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_clean_document() {
        let result = check("X:1\nT:Clean\nK:C\nCDEF|GABc|]\n");
        assert!(!result.has_errors);
    }

    #[test]
    fn test_check_collects_diagnostics() {
        let result = check("X:1\nK:C\n[CEG|DEF|\n");
        assert!(result.has_errors);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.kind == "unterminated_chord"));
    }

    #[test]
    fn test_check_json_dump() {
        let result = check("X:1\nK:C\n[CEG|\n");
        let json = result.to_json().expect("diagnostics serialize");
        assert!(json.contains("unterminated_chord"));
    }

    #[test]
    fn test_format_refuses_errors() {
        let err = format("X:1\nK:C\n[CEG|\n");
        assert!(matches!(err, Err(AbcError::DocumentHasErrors(_))));
    }

    #[test]
    fn test_format_clean_document() {
        let out = format("X:1\nK:C\nCDEF|\n").expect("clean document formats");
        assert_eq!(out, "X:1\nK:C\nCDEF|\n");
    }

    #[test]
    fn test_transpose_contract() {
        let out = transpose("X:1\nK:C\nCDEF|\n", 2, None).expect("transposes");
        assert_eq!(out, "X:1\nK:C\nDE^FG|\n");
    }

    #[test]
    fn test_snapshots_exposed_to_hosts() {
        let parsed = parse_document("X:1\nM:6/8\nK:D\nABC\n");
        assert!(parsed.snapshots.at(4, 1).is_some());
    }
}
