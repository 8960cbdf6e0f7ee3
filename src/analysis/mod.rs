//! Semantic analysis of info lines and stylesheet directives
//!
//! Each line kind has its own small grammar operating over the line's
//! already-scanned value tokens, never over raw characters. Analyzers
//! return `Ok(Some(..))` for a recognized, well-formed line, `Ok(None)`
//! plus a reported diagnostic for a recognized but malformed one, and
//! `Ok(None)` without a diagnostic for keys that are legitimate free
//! text (history, notes, ...). Passing a node that is not an info line
//! or directive at all is a programmer error and comes back as `Err`.

pub mod directives;
pub mod key;
pub mod meter;
pub mod tempo;
pub mod voice;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AbcError;
use crate::models::ast::{FileStructure, Node};
use crate::models::{AbcContext, SemanticData};
use crate::parse::tokens::{Token, TokenKind};
use crate::rational::Rational;

/// Analyze one `InfoLine`, `InlineField`, `MacroDecl` or `Lyrics` node.
pub fn analyze_info_line(
    node: &Node,
    ctx: &mut AbcContext,
) -> Result<Option<SemanticData>, AbcError> {
    let (key, values) = match node {
        Node::InfoLine { key, values, .. } | Node::InlineField { key, values, .. } => {
            (key, values)
        }
        // Lyric and macro lines are structural, not semantic.
        Node::Lyrics { .. } | Node::MacroDecl { .. } | Node::UserSymbolDecl { .. } => {
            return Ok(None)
        }
        _ => return Err(AbcError::NotAnalyzable),
    };

    let result = match key.lexeme.chars().next() {
        Some('K') => key::analyze(key, values, ctx),
        Some('M') => meter::analyze(key, values, ctx),
        Some('L') => analyze_note_length(key, values, ctx),
        Some('Q') => tempo::analyze(key, values, ctx),
        Some('V') => voice::analyze(key, values, ctx),
        Some('T') => Some(SemanticData::Title(text_value(values))),
        Some('C') => Some(SemanticData::Composer(text_value(values))),
        Some('X') => analyze_tune_number(key, values, ctx),
        // Unknown keys are legitimate free-text headers.
        _ => None,
    };
    Ok(result)
}

/// Analyze one `Directive` node.
pub fn analyze_directive(
    node: &Node,
    ctx: &mut AbcContext,
) -> Result<Option<SemanticData>, AbcError> {
    let (key, values) = match node {
        Node::Directive { key, values, .. } => (key, values),
        _ => return Err(AbcError::NotAnalyzable),
    };
    Ok(directives::analyze(key, values, ctx))
}

/// Analyzed payloads for a whole document, keyed by node id
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SemanticModel {
    pub entries: HashMap<u32, SemanticData>,
}

impl SemanticModel {
    pub fn get(&self, node_id: u32) -> Option<&SemanticData> {
        self.entries.get(&node_id)
    }
}

/// Run the analyzer over every info line and directive in the document.
pub fn analyze_document(file: &FileStructure, ctx: &mut AbcContext) -> SemanticModel {
    let mut model = SemanticModel::default();
    let mut pending = Vec::new();
    file.walk(&mut |node| {
        if matches!(
            node,
            Node::InfoLine { .. } | Node::InlineField { .. } | Node::Directive { .. }
        ) {
            pending.push(node.clone());
        }
    });
    for node in &pending {
        let analyzed = match node {
            Node::Directive { .. } => analyze_directive(node, ctx),
            _ => analyze_info_line(node, ctx),
        };
        if let Ok(Some(data)) = analyzed {
            model.entries.insert(node.id(), data);
        }
    }
    log::debug!("analyzed {} semantic entries", model.entries.len());
    model
}

/// L: unit note length — a plain fraction
fn analyze_note_length(
    key: &Token,
    values: &[Token],
    ctx: &mut AbcContext,
) -> Option<SemanticData> {
    let mut cursor = ValueCursor::new(values);
    let fraction = cursor.fraction();
    match fraction {
        Some(r) if cursor.at_end() => Some(SemanticData::NoteLength(r)),
        _ => {
            cursor.report_malformed(key, ctx, "bad_note_length", "expected a fraction like 1/8");
            None
        }
    }
}

/// X: tune number — a plain integer
fn analyze_tune_number(key: &Token, values: &[Token], ctx: &mut AbcContext) -> Option<SemanticData> {
    let mut cursor = ValueCursor::new(values);
    match cursor.next() {
        Some(t) if t.kind == TokenKind::Number && cursor.at_end() => {
            t.lexeme.parse::<u32>().ok().map(SemanticData::TuneNumber)
        }
        _ => {
            cursor.report_malformed(key, ctx, "bad_tune_number", "expected a tune number");
            None
        }
    }
}

/// Raw textual value of a free-text header (T:, C:, ...), trimmed
fn text_value(values: &[Token]) -> String {
    let mut out = String::new();
    for token in values {
        out.push_str(&token.lexeme);
    }
    out.trim().to_string()
}

/// Cursor over a line's value tokens, skipping whitespace and comments.
/// The shared plumbing of every sub-analyzer.
pub(crate) struct ValueCursor<'a> {
    tokens: Vec<&'a Token>,
    pos: usize,
}

impl<'a> ValueCursor<'a> {
    pub(crate) fn new(values: &'a [Token]) -> Self {
        let tokens = values
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment))
            .collect();
        Self { tokens, pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).copied()
    }

    pub(crate) fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Consume the next token if it has the given kind
    pub(crate) fn eat(&mut self, kind: TokenKind) -> Option<&'a Token> {
        match self.peek() {
            Some(t) if t.kind == kind => self.next(),
            _ => None,
        }
    }

    /// Fraction: `p/q`, bare `p` (denominator 1), or bare `/q`
    pub(crate) fn fraction(&mut self) -> Option<Rational> {
        let numerator = self
            .eat(TokenKind::Number)
            .and_then(|t| t.lexeme.parse::<i64>().ok());
        if self.eat(TokenKind::Slash).is_some() {
            let denominator = self
                .eat(TokenKind::Number)
                .and_then(|t| t.lexeme.parse::<i64>().ok())
                .unwrap_or(2);
            Some(Rational::new(numerator.unwrap_or(1), denominator))
        } else {
            numerator.map(Rational::from_integer)
        }
    }

    /// Signed integer: an optional `-` discard token glued before a number
    pub(crate) fn signed_integer(&mut self) -> Option<i64> {
        let negative = matches!(self.peek(), Some(t) if t.kind == TokenKind::Discard && t.lexeme == "-");
        if negative {
            self.next();
        }
        let value = self
            .eat(TokenKind::Number)
            .and_then(|t| t.lexeme.parse::<i64>().ok())?;
        Some(if negative { -value } else { value })
    }

    /// Decimal: a number, or number `.` number scanned as three tokens
    pub(crate) fn decimal(&mut self) -> Option<f64> {
        let whole = self.eat(TokenKind::Number)?;
        let mut text = whole.lexeme.clone();
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Discard && t.lexeme == ".") {
            self.next();
            text.push('.');
            if let Some(frac) = self.eat(TokenKind::Number) {
                text.push_str(&frac.lexeme);
            }
        }
        text.parse::<f64>().ok()
    }

    /// Report a malformed line at the position of the token under the
    /// cursor (or the key token when the value ran out)
    pub(crate) fn report_malformed(
        &self,
        key: &Token,
        ctx: &mut AbcContext,
        kind: &str,
        message: &str,
    ) {
        let at = self.peek().unwrap_or(key);
        ctx.reporter.add(
            crate::diagnostics::DiagnosticMark::new(
                at.line,
                at.column,
                crate::diagnostics::DiagnosticSeverity::Error,
                kind,
                message,
            )
            .with_len(at.lexeme.chars().count().max(1))
            .with_subject(at.id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::scanner::scan;
    use crate::parse::grammar::parse;

    fn analyze_line(source: &str) -> (Option<SemanticData>, AbcContext) {
        let mut ctx = AbcContext::new();
        let tokens = scan(source, &mut ctx);
        let file = parse(tokens, &mut ctx);
        let mut found = None;
        file.walk(&mut |n| {
            if found.is_none() && matches!(n, Node::InfoLine { .. }) {
                found = Some(n.clone());
            }
        });
        let node = found.expect("source should contain an info line");
        let data = analyze_info_line(&node, &mut ctx).expect("info line is analyzable");
        (data, ctx)
    }

    #[test]
    fn test_note_length_line() {
        let (data, ctx) = analyze_line("L:1/16\n");
        assert_eq!(data, Some(SemanticData::NoteLength(Rational::new(1, 16))));
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn test_malformed_note_length_reports() {
        let (data, ctx) = analyze_line("L:fast\n");
        assert_eq!(data, None);
        assert!(ctx.reporter.has_errors());
    }

    #[test]
    fn test_title_is_free_text() {
        let (data, _) = analyze_line("T:The Foggy Dew\n");
        assert_eq!(data, Some(SemanticData::Title("The Foggy Dew".to_string())));
    }

    #[test]
    fn test_unknown_key_is_silent() {
        let (data, ctx) = analyze_line("N:just a note to the reader\n");
        assert_eq!(data, None);
        assert!(ctx.reporter.is_empty(), "unknown keys are not diagnosed");
    }

    #[test]
    fn test_tune_number() {
        let (data, _) = analyze_line("X:42\n");
        assert_eq!(data, Some(SemanticData::TuneNumber(42)));
    }

    #[test]
    fn test_non_line_node_is_a_programmer_error() {
        let mut ctx = AbcContext::new();
        let tokens = scan("X:1\nK:C\nA\n", &mut ctx);
        let file = parse(tokens, &mut ctx);
        let mut note = None;
        file.walk(&mut |n| {
            if note.is_none() && matches!(n, Node::Note { .. }) {
                note = Some(n.clone());
            }
        });
        let err = analyze_info_line(&note.expect("a note exists"), &mut ctx);
        assert!(matches!(err, Err(AbcError::NotAnalyzable)));
    }

    #[test]
    fn test_analyze_document_collects_entries() {
        let mut ctx = AbcContext::new();
        let tokens = scan("X:1\nT:Air\nM:6/8\nL:1/8\nK:D\nABC\n", &mut ctx);
        let file = parse(tokens, &mut ctx);
        let model = analyze_document(&file, &mut ctx);
        assert_eq!(model.entries.len(), 5, "X T M L K all analyze");
    }
}
