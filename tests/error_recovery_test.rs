//! Error recovery: diagnostics accumulate, parsing never aborts

use abc_core::api::{check, parse_document};
use abc_core::diagnostics::DiagnosticSeverity;
use abc_core::format::stringify;
use abc_core::models::Node;

#[test]
fn test_unterminated_chord_single_diagnostic() {
    let parsed = parse_document("X:1\nK:C\n[CEG|DEF|\n");
    let errors: Vec<_> = parsed.context.reporter.errors().collect();
    assert_eq!(errors.len(), 1, "one mistake, one diagnostic");
    assert_eq!(errors[0].kind, "unterminated_chord");
    assert_eq!(errors[0].line, 3);

    // The tree survives: the bad chord degrades to a recovery node and
    // the music after the bar line still parses as notes.
    assert!(parsed.file.has_error_nodes());
    let mut notes = 0;
    parsed.file.walk(&mut |n| {
        if matches!(n, Node::Note { .. }) {
            notes += 1;
        }
    });
    assert_eq!(notes, 3, "the bar after the bad chord parses");
}

#[test]
fn test_independent_errors_each_report() {
    let result = check("X:1\nK:C\n[CEG|{ab|\n");
    let errors: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.severity == DiagnosticSeverity::Error)
        .collect();
    assert_eq!(errors.len(), 2, "chord and grace group report separately");
}

#[test]
fn test_bad_header_line_does_not_stop_the_body() {
    let parsed = parse_document("X:1\nM:not a meter\nK:C\nCDEF|\n");
    assert!(parsed.context.reporter.has_errors());
    let mut notes = 0;
    parsed.file.walk(&mut |n| {
        if matches!(n, Node::Note { .. }) {
            notes += 1;
        }
    });
    assert_eq!(notes, 4, "body still parses after a bad M: line");
}

#[test]
fn test_discarded_character_degrades_gracefully() {
    let source = "X:1\nK:C\nAB\u{00b7}CD|\n";
    let parsed = parse_document(source);
    assert_eq!(stringify(&parsed.file), source, "discards stay in the tree");
    let warnings = parsed
        .context
        .reporter
        .marks
        .iter()
        .filter(|m| m.severity == DiagnosticSeverity::Warning)
        .count();
    assert!(warnings >= 1, "the bad character is reported");
}

#[test]
fn test_caret_rendering_points_at_the_offense() {
    let source = "X:1\nK:C\n[CEG|\n";
    let parsed = parse_document(source);
    let mark = parsed
        .context
        .reporter
        .errors()
        .next()
        .expect("a diagnostic exists");
    let caret = mark.render_caret(source).expect("caret renders");
    assert!(caret.starts_with("[CEG|"), "caret shows the source line");
    assert!(caret.contains('^'), "caret points at the column");
}

#[test]
fn test_missing_key_line_is_reported() {
    let result = check("X:1\nT:No Key\n\nX:2\nK:C\nA|\n");
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.kind == "missing_key_line"));
}
