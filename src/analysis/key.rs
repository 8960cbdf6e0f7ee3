//! K: line sub-grammar
//!
//! `K:` accepts a root letter with an optional #/b suffix, an optional
//! mode keyword (possibly glued to the root, "F#dor"), and zero or more
//! `key=value` modifiers. `K:none` clears the signature. Unrecognized
//! modifier keys are reported as warnings but do not fail the line; an
//! unparseable root or mode does.

use super::ValueCursor;
use crate::diagnostics::{DiagnosticMark, DiagnosticSeverity};
use crate::models::pitch::{Accidental, Clef, KeySignature, Mode};
use crate::models::{AbcContext, SemanticData};
use crate::parse::tokens::{Token, TokenKind};

pub(crate) fn analyze(key: &Token, values: &[Token], ctx: &mut AbcContext) -> Option<SemanticData> {
    let mut cursor = ValueCursor::new(values);

    let head = match cursor.next() {
        Some(t) if t.kind == TokenKind::Identifier => t,
        _ => {
            cursor.report_malformed(key, ctx, "bad_key", "expected a key root (A-G) or 'none'");
            return None;
        }
    };

    let (root, accidental, mut mode) = match parse_root(&head.lexeme) {
        Some(parts) => parts,
        None => {
            report_error(ctx, head, "bad_key", "unrecognized key root");
            return None;
        }
    };
    if matches!(mode, Some(Mode::NoKey)) && !cursor.at_end() {
        report_error(ctx, head, "bad_key", "K:none takes no further values");
        return None;
    }

    let mut clef = None;
    let mut modifiers = Vec::new();

    while let Some(token) = cursor.next() {
        if token.kind != TokenKind::Identifier {
            report_error(ctx, token, "bad_key", "unexpected token on K: line");
            return None;
        }
        // key=value modifier?
        if cursor.eat(TokenKind::Assign).is_some() {
            let value = match cursor.next() {
                Some(v)
                    if matches!(
                        v.kind,
                        TokenKind::Identifier | TokenKind::Number | TokenKind::Quoted
                    ) =>
                {
                    v
                }
                _ => {
                    report_error(ctx, token, "bad_key_modifier", "modifier has no value");
                    return None;
                }
            };
            match token.lexeme.to_ascii_lowercase().as_str() {
                "clef" => match Clef::from_name(&value.lexeme) {
                    Some(c) => clef = Some(c),
                    None => {
                        report_error(ctx, value, "bad_clef", "unrecognized clef name");
                        return None;
                    }
                },
                "transpose" | "octave" | "stafflines" | "staffscale" | "middle" | "style" => {
                    modifiers.push((token.lexeme.to_ascii_lowercase(), value.lexeme.clone()));
                }
                _ => {
                    report_warning(ctx, token, "unknown_key_modifier", "unrecognized modifier key");
                    modifiers.push((token.lexeme.clone(), value.lexeme.clone()));
                }
            }
            continue;
        }
        // Bare word: a mode keyword, or a bare clef name.
        if mode.is_none() {
            if let Some(m) = Mode::from_name(&token.lexeme) {
                mode = Some(m);
                continue;
            }
        }
        if clef.is_none() {
            if let Some(c) = Clef::from_name(&token.lexeme) {
                clef = Some(c);
                continue;
            }
        }
        report_error(ctx, token, "bad_mode", "unrecognized mode keyword");
        return None;
    }

    let mode = mode.unwrap_or(Mode::Major);
    let mut signature = match KeySignature::new(root, accidental, mode) {
        Some(sig) => sig,
        None => {
            report_error(ctx, head, "bad_key", "key root out of range");
            return None;
        }
    };
    signature.clef = clef;
    signature.modifiers = modifiers;
    Some(SemanticData::Key(signature))
}

/// Split a head lexeme like "F#dor" into root, accidental and glued mode
fn parse_root(lexeme: &str) -> Option<(char, Option<Accidental>, Option<Mode>)> {
    if lexeme.eq_ignore_ascii_case("none") {
        return Some(('C', None, Some(Mode::NoKey)));
    }
    let mut chars = lexeme.chars();
    let root = chars.next()?;
    if !matches!(root.to_ascii_uppercase(), 'A'..='G') {
        return None;
    }
    let rest = chars.as_str();
    // Doubled suffixes first, so "##" is not consumed as "#".
    let suffix = ["##", "bb", "#", "b"]
        .into_iter()
        .find(|s| rest.starts_with(s));
    let (accidental, rest) = match suffix {
        Some(s) => (Accidental::from_suffix(s), &rest[s.len()..]),
        None => (None, rest),
    };
    if rest.is_empty() {
        return Some((root.to_ascii_uppercase(), accidental, None));
    }
    let mode = Mode::from_name(rest)?;
    Some((root.to_ascii_uppercase(), accidental, Some(mode)))
}

fn report_error(ctx: &mut AbcContext, token: &Token, kind: &str, message: &str) {
    ctx.reporter.add(
        DiagnosticMark::new(token.line, token.column, DiagnosticSeverity::Error, kind, message)
            .with_len(token.lexeme.chars().count().max(1))
            .with_subject(token.id),
    );
}

fn report_warning(ctx: &mut AbcContext, token: &Token, kind: &str, message: &str) {
    ctx.reporter.add(
        DiagnosticMark::new(token.line, token.column, DiagnosticSeverity::Warning, kind, message)
            .with_len(token.lexeme.chars().count().max(1))
            .with_subject(token.id),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ast::Node;
    use crate::parse::grammar::parse;
    use crate::parse::scanner::scan;

    fn analyze_key_line(value: &str) -> (Option<SemanticData>, AbcContext) {
        let source = format!("X:1\nK:{}\nA\n", value);
        let mut ctx = AbcContext::new();
        let tokens = scan(&source, &mut ctx);
        let file = parse(tokens, &mut ctx);
        let mut result = None;
        file.walk(&mut |n| {
            if let Node::InfoLine { key, values, .. } = n {
                if key.lexeme.starts_with('K') && result.is_none() {
                    result = Some((key.clone(), values.clone()));
                }
            }
        });
        let (key, values) = result.expect("K: line present");
        let data = analyze(&key, &values, &mut ctx);
        (data, ctx)
    }

    fn expect_key(data: Option<SemanticData>) -> KeySignature {
        match data {
            Some(SemanticData::Key(sig)) => sig,
            other => panic!("expected a key signature, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_major_key() {
        let (data, ctx) = analyze_key_line("D");
        let sig = expect_key(data);
        assert_eq!(sig.root, 'D');
        assert_eq!(sig.mode, Mode::Major);
        assert_eq!(sig.accidentals.len(), 2);
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn test_glued_mode_and_suffix() {
        let (data, _) = analyze_key_line("F#dor");
        let sig = expect_key(data);
        assert_eq!(sig.root, 'F');
        assert_eq!(sig.accidental, Some(Accidental::Sharp));
        assert_eq!(sig.mode, Mode::Dorian);
        assert_eq!(sig.accidentals.len(), 4);
    }

    #[test]
    fn test_separate_mode_word_case_insensitive() {
        let (data, _) = analyze_key_line("A Mixolydian");
        let sig = expect_key(data);
        assert_eq!(sig.mode, Mode::Mixolydian);
    }

    #[test]
    fn test_clef_modifier() {
        let (data, ctx) = analyze_key_line("F# dorian clef=bass");
        let sig = expect_key(data);
        assert_eq!(sig.clef, Some(Clef::Bass));
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn test_unknown_modifier_warns_but_succeeds() {
        let (data, ctx) = analyze_key_line("G shift=2");
        let sig = expect_key(data);
        assert_eq!(sig.modifiers, vec![("shift".to_string(), "2".to_string())]);
        assert!(!ctx.reporter.has_errors(), "warning only");
        assert_eq!(ctx.reporter.len(), 1);
    }

    #[test]
    fn test_key_none() {
        let (data, _) = analyze_key_line("none");
        let sig = expect_key(data);
        assert_eq!(sig.mode, Mode::NoKey);
        assert!(sig.accidentals.is_empty());
    }

    #[test]
    fn test_bad_root_reports_and_fails() {
        let (data, ctx) = analyze_key_line("H");
        assert!(data.is_none());
        assert!(ctx.reporter.has_errors());
    }

    #[test]
    fn test_bad_clef_fails_line() {
        let (data, ctx) = analyze_key_line("G clef=banjo");
        assert!(data.is_none());
        assert!(ctx.reporter.has_errors());
    }
}
