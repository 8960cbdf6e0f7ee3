//! V: line sub-grammar
//!
//! A voice line names an id and then a standard property set, each
//! property independently validated. Any out-of-domain value fails the
//! whole line with a reported diagnostic.

use super::ValueCursor;
use crate::diagnostics::{DiagnosticMark, DiagnosticSeverity};
use crate::models::pitch::Clef;
use crate::models::semantics::{ChordPlacement, StaffGrouping, StemDirection, VoiceData};
use crate::models::{AbcContext, SemanticData};
use crate::parse::tokens::{Token, TokenKind};

pub(crate) fn analyze(key: &Token, values: &[Token], ctx: &mut AbcContext) -> Option<SemanticData> {
    let mut cursor = ValueCursor::new(values);

    let id = match cursor.next() {
        Some(t) if matches!(t.kind, TokenKind::Identifier | TokenKind::Number) => {
            t.lexeme.clone()
        }
        _ => {
            cursor.report_malformed(key, ctx, "bad_voice", "expected a voice id");
            return None;
        }
    };
    let mut voice = VoiceData::new(id);

    while let Some(token) = cursor.next() {
        if token.kind != TokenKind::Identifier {
            report(ctx, token, "bad_voice", "unexpected token on V: line");
            return None;
        }
        let property = token.lexeme.to_ascii_lowercase();

        if cursor.eat(TokenKind::Assign).is_none() {
            // Bare keyword properties.
            match property.as_str() {
                "perc" => voice.perc = true,
                "merge" => voice.merge = true,
                _ => {
                    report(ctx, token, "bad_voice_property", "property without a value");
                    return None;
                }
            }
            continue;
        }

        match property.as_str() {
            "name" | "nm" => match cursor.next() {
                Some(v) if matches!(v.kind, TokenKind::Quoted | TokenKind::Identifier) => {
                    voice.name = Some(v.lexeme.trim_matches('"').to_string());
                }
                _ => {
                    report(ctx, token, "bad_voice_property", "expected a name value");
                    return None;
                }
            },
            "clef" => match cursor.next().and_then(|v| Clef::from_name(&v.lexeme)) {
                Some(c) => voice.clef = Some(c),
                None => {
                    report(ctx, token, "bad_clef", "unrecognized clef name");
                    return None;
                }
            },
            "transpose" => match cursor.signed_integer() {
                Some(n) => voice.transpose = Some(n as i32),
                None => {
                    report(ctx, token, "bad_voice_property", "expected a transpose amount");
                    return None;
                }
            },
            "octave" => match cursor.signed_integer() {
                Some(n) => voice.octave = Some(n as i32),
                None => {
                    report(ctx, token, "bad_voice_property", "expected an octave shift");
                    return None;
                }
            },
            "middle" => match cursor.next() {
                Some(v) if v.kind == TokenKind::Identifier => {
                    voice.middle = Some(v.lexeme.clone());
                }
                _ => {
                    report(ctx, token, "bad_voice_property", "expected a middle pitch");
                    return None;
                }
            },
            "stafflines" => match cursor.eat(TokenKind::Number).and_then(|v| v.lexeme.parse().ok())
            {
                Some(n) => voice.stafflines = Some(n),
                None => {
                    report(ctx, token, "bad_voice_property", "expected a staff line count");
                    return None;
                }
            },
            "staffscale" => match cursor.decimal() {
                Some(s) => voice.staffscale = Some(s),
                None => {
                    report(ctx, token, "bad_voice_property", "expected a staff scale");
                    return None;
                }
            },
            "instrument" => match cursor.eat(TokenKind::Number).and_then(|v| v.lexeme.parse().ok())
            {
                Some(n) => voice.instrument = Some(n),
                None => {
                    report(ctx, token, "bad_voice_property", "expected an instrument number");
                    return None;
                }
            },
            "stem" => match cursor
                .next()
                .and_then(|v| StemDirection::from_name(&v.lexeme))
            {
                Some(s) => voice.stem = Some(s),
                None => {
                    report(ctx, token, "bad_stem", "unrecognized stem direction");
                    return None;
                }
            },
            "gchord" => match cursor.next().map(|v| v.lexeme.to_ascii_lowercase()) {
                Some(v) if v == "above" => voice.gchord = Some(ChordPlacement::Above),
                Some(v) if v == "below" => voice.gchord = Some(ChordPlacement::Below),
                _ => {
                    report(ctx, token, "bad_voice_property", "expected 'above' or 'below'");
                    return None;
                }
            },
            "space" => match cursor.decimal() {
                Some(s) => voice.space = Some(s),
                None => {
                    report(ctx, token, "bad_voice_property", "expected a spacing value");
                    return None;
                }
            },
            "bracket" | "brace" => match grouping(&property, cursor.next()) {
                Some(g) => voice.grouping = Some(g),
                None => {
                    report(ctx, token, "bad_voice_property", "expected start, continue or end");
                    return None;
                }
            },
            _ => {
                report(ctx, token, "bad_voice_property", "unrecognized voice property");
                return None;
            }
        }
    }

    Some(SemanticData::Voice(voice))
}

fn grouping(kind: &str, value: Option<&Token>) -> Option<StaffGrouping> {
    let value = value?.lexeme.to_ascii_lowercase();
    match (kind, value.as_str()) {
        ("bracket", "start") => Some(StaffGrouping::BracketStart),
        ("bracket", "continue") => Some(StaffGrouping::BracketContinue),
        ("bracket", "end") => Some(StaffGrouping::BracketEnd),
        ("brace", "start") => Some(StaffGrouping::BraceStart),
        ("brace", "continue") => Some(StaffGrouping::BraceContinue),
        ("brace", "end") => Some(StaffGrouping::BraceEnd),
        _ => None,
    }
}

fn report(ctx: &mut AbcContext, token: &Token, kind: &str, message: &str) {
    ctx.reporter.add(
        DiagnosticMark::new(token.line, token.column, DiagnosticSeverity::Error, kind, message)
            .with_len(token.lexeme.chars().count().max(1))
            .with_subject(token.id),
    );
}
