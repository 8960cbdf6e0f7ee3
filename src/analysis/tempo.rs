//! Q: line sub-grammar
//!
//! `Q:` accepts an optional leading quoted annotation, an optional
//! `duration=bpm` pair (or a bare bpm number), and an optional trailing
//! quoted annotation. Any of the three parts may stand alone.

use super::ValueCursor;
use crate::models::semantics::TempoData;
use crate::models::{AbcContext, SemanticData};
use crate::parse::tokens::{Token, TokenKind};

pub(crate) fn analyze(key: &Token, values: &[Token], ctx: &mut AbcContext) -> Option<SemanticData> {
    let mut cursor = ValueCursor::new(values);
    let mut tempo = TempoData {
        leading_text: None,
        duration: None,
        bpm: None,
        trailing_text: None,
    };

    if let Some(t) = cursor.eat(TokenKind::Quoted) {
        tempo.leading_text = Some(strip_quotes(&t.lexeme));
    }

    if matches!(cursor.peek(), Some(t) if t.kind == TokenKind::Number) {
        // Either "1/4=120" or a bare "120".
        let mark = cursor.peek();
        let fraction = cursor.fraction();
        if cursor.eat(TokenKind::Assign).is_some() {
            tempo.duration = fraction;
            match cursor.eat(TokenKind::Number).and_then(|t| t.lexeme.parse::<u32>().ok()) {
                Some(bpm) => tempo.bpm = Some(bpm),
                None => {
                    cursor.report_malformed(key, ctx, "bad_tempo", "expected a bpm after '='");
                    return None;
                }
            }
        } else if let Some(bare) = mark {
            // No '=': the number was a bare bpm, not a duration.
            match bare.lexeme.parse::<u32>() {
                Ok(bpm) if fraction.map(|f| f.denominator() == 1).unwrap_or(false) => {
                    tempo.bpm = Some(bpm);
                }
                _ => {
                    cursor.report_malformed(key, ctx, "bad_tempo", "expected duration=bpm");
                    return None;
                }
            }
        }
    }

    if let Some(t) = cursor.eat(TokenKind::Quoted) {
        tempo.trailing_text = Some(strip_quotes(&t.lexeme));
    }

    if !cursor.at_end() {
        cursor.report_malformed(key, ctx, "bad_tempo", "trailing content on Q: line");
        return None;
    }
    if tempo.leading_text.is_none()
        && tempo.duration.is_none()
        && tempo.bpm.is_none()
        && tempo.trailing_text.is_none()
    {
        cursor.report_malformed(key, ctx, "bad_tempo", "empty Q: line");
        return None;
    }
    Some(SemanticData::Tempo(tempo))
}

fn strip_quotes(lexeme: &str) -> String {
    lexeme.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ast::Node;
    use crate::parse::grammar::parse;
    use crate::parse::scanner::scan;
    use crate::rational::Rational;

    fn analyze_tempo_line(value: &str) -> (Option<SemanticData>, AbcContext) {
        let source = format!("X:1\nQ:{}\nK:C\nA\n", value);
        let mut ctx = AbcContext::new();
        let tokens = scan(&source, &mut ctx);
        let file = parse(tokens, &mut ctx);
        let mut found = None;
        file.walk(&mut |n| {
            if let Node::InfoLine { key, values, .. } = n {
                if key.lexeme.starts_with('Q') && found.is_none() {
                    found = Some((key.clone(), values.clone()));
                }
            }
        });
        let (key, values) = found.expect("Q: line present");
        let data = analyze(&key, &values, &mut ctx);
        (data, ctx)
    }

    fn expect_tempo(data: Option<SemanticData>) -> TempoData {
        match data {
            Some(SemanticData::Tempo(t)) => t,
            other => panic!("expected tempo data, got {:?}", other),
        }
    }

    #[test]
    fn test_duration_bpm_pair() {
        let (data, ctx) = analyze_tempo_line("1/4=120");
        let tempo = expect_tempo(data);
        assert_eq!(tempo.duration, Some(Rational::new(1, 4)));
        assert_eq!(tempo.bpm, Some(120));
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn test_bare_bpm() {
        let (data, _) = analyze_tempo_line("96");
        let tempo = expect_tempo(data);
        assert_eq!(tempo.bpm, Some(96));
        assert_eq!(tempo.duration, None);
    }

    #[test]
    fn test_annotations_around_pair() {
        let (data, _) = analyze_tempo_line("\"Allegro\" 1/4=132 \"ca.\"");
        let tempo = expect_tempo(data);
        assert_eq!(tempo.leading_text.as_deref(), Some("Allegro"));
        assert_eq!(tempo.trailing_text.as_deref(), Some("ca."));
        assert_eq!(tempo.bpm, Some(132));
    }

    #[test]
    fn test_annotation_only() {
        let (data, _) = analyze_tempo_line("\"Slowly\"");
        let tempo = expect_tempo(data);
        assert_eq!(tempo.leading_text.as_deref(), Some("Slowly"));
        assert_eq!(tempo.bpm, None);
    }

    #[test]
    fn test_missing_bpm_reports() {
        let (data, ctx) = analyze_tempo_line("1/4=");
        assert!(data.is_none());
        assert!(ctx.reporter.has_errors());
    }

    #[test]
    fn test_empty_line_reports() {
        let (data, ctx) = analyze_tempo_line("");
        assert!(data.is_none());
        assert!(ctx.reporter.has_errors());
    }
}
