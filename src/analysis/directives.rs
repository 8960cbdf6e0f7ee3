//! Stylesheet directive analysis
//!
//! Only a handful of `%%` directives carry typed payloads; the rest are
//! formatting hints for downstream renderers and stay raw. The MIDI
//! subcommand is normalized case-insensitively, a deliberate divergence
//! from reference implementations that pass it through case-sensitively.

use super::ValueCursor;
use crate::diagnostics::{DiagnosticMark, DiagnosticSeverity};
use crate::models::semantics::{MidiData, VisibilityMode};
use crate::models::{AbcContext, SemanticData};
use crate::parse::tokens::{Token, TokenKind};

pub(crate) fn analyze(key: &Token, values: &[Token], ctx: &mut AbcContext) -> Option<SemanticData> {
    match key.lexeme.to_ascii_lowercase().as_str() {
        "voices" => analyze_visibility(key, values, ctx),
        "midi" => analyze_midi(key, values, ctx),
        // %%score, %%staves, page layout etc. stay raw.
        _ => None,
    }
}

/// `%%voices <show|hide> <id>...` — requires exactly a mode keyword and
/// one or more voice ids; a partial directive is an error, not a no-op.
fn analyze_visibility(key: &Token, values: &[Token], ctx: &mut AbcContext) -> Option<SemanticData> {
    let mut cursor = ValueCursor::new(values);
    let mode = match cursor
        .next()
        .filter(|t| t.kind == TokenKind::Identifier)
        .and_then(|t| VisibilityMode::from_name(&t.lexeme))
    {
        Some(mode) => mode,
        None => {
            cursor.report_malformed(key, ctx, "bad_voices_directive", "expected 'show' or 'hide'");
            return None;
        }
    };
    let mut voices = Vec::new();
    while let Some(token) = cursor.next() {
        if matches!(token.kind, TokenKind::Identifier | TokenKind::Number) {
            voices.push(token.lexeme.clone());
        } else {
            report(ctx, token, "bad_voices_directive", "expected a voice id");
            return None;
        }
    }
    if voices.is_empty() {
        report(ctx, key, "bad_voices_directive", "no voice ids given");
        return None;
    }
    Some(SemanticData::VoiceVisibility { mode, voices })
}

/// `%%MIDI subcommand values...`
fn analyze_midi(key: &Token, values: &[Token], ctx: &mut AbcContext) -> Option<SemanticData> {
    let mut cursor = ValueCursor::new(values);
    let subcommand = match cursor.next() {
        Some(t) if t.kind == TokenKind::Identifier => t.lexeme.to_ascii_lowercase(),
        _ => {
            cursor.report_malformed(key, ctx, "bad_midi_directive", "expected a MIDI subcommand");
            return None;
        }
    };
    let mut out = Vec::new();
    while let Some(token) = cursor.next() {
        out.push(token.lexeme.clone());
    }
    Some(SemanticData::Midi(MidiData {
        subcommand,
        values: out,
    }))
}

fn report(ctx: &mut AbcContext, token: &Token, kind: &str, message: &str) {
    ctx.reporter.add(
        DiagnosticMark::new(token.line, token.column, DiagnosticSeverity::Error, kind, message)
            .with_len(token.lexeme.chars().count().max(1))
            .with_subject(token.id),
    );
}
