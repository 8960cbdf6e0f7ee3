//! M: line sub-grammar
//!
//! Accepts `C` (common time), `C|` (cut time), and one or more fractions
//! whose numerators may be parenthesized sums, `(2+3+2)/8`, summed left
//! to right.

use super::ValueCursor;
use crate::models::semantics::MeterData;
use crate::models::{AbcContext, SemanticData};
use crate::parse::tokens::{Token, TokenKind};
use crate::rational::Rational;

pub(crate) fn analyze(key: &Token, values: &[Token], ctx: &mut AbcContext) -> Option<SemanticData> {
    let mut cursor = ValueCursor::new(values);

    // Literal common/cut time markers.
    if let Some(head) = cursor.peek() {
        if head.kind == TokenKind::Identifier && head.lexeme == "C" {
            cursor.next();
            let meter = if cursor.eat(TokenKind::Pipe).is_some() {
                MeterData::Cut
            } else {
                MeterData::Common
            };
            if !cursor.at_end() {
                cursor.report_malformed(key, ctx, "bad_meter", "trailing content after meter");
                return None;
            }
            return Some(SemanticData::Meter(meter));
        }
        // M:none — free meter, nothing to record.
        if head.kind == TokenKind::Identifier && head.lexeme.eq_ignore_ascii_case("none") {
            return None;
        }
    }

    let mut fractions = Vec::new();
    while !cursor.at_end() {
        match fraction(&mut cursor) {
            Some(f) => fractions.push(f),
            None => {
                cursor.report_malformed(key, ctx, "bad_meter", "expected a fraction like 6/8");
                return None;
            }
        }
    }
    if fractions.is_empty() {
        cursor.report_malformed(key, ctx, "bad_meter", "empty meter");
        return None;
    }
    Some(SemanticData::Meter(MeterData::Fractions(fractions)))
}

/// One fraction with an optionally parenthesized, summed numerator
fn fraction(cursor: &mut ValueCursor) -> Option<Rational> {
    let numerator = if cursor.eat(TokenKind::ParenOpen).is_some() {
        let mut sum = cursor
            .eat(TokenKind::Number)?
            .lexeme
            .parse::<i64>()
            .ok()?;
        while cursor.eat(TokenKind::Plus).is_some() {
            sum += cursor.eat(TokenKind::Number)?.lexeme.parse::<i64>().ok()?;
        }
        cursor.eat(TokenKind::ParenClose)?;
        sum
    } else {
        cursor.eat(TokenKind::Number)?.lexeme.parse::<i64>().ok()?
    };
    cursor.eat(TokenKind::Slash)?;
    let denominator = cursor.eat(TokenKind::Number)?.lexeme.parse::<i64>().ok()?;
    Some(Rational::new(numerator, denominator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::scanner::scan;
    use crate::models::ast::Node;
    use crate::parse::grammar::parse;

    fn analyze_meter_line(value: &str) -> (Option<SemanticData>, AbcContext) {
        let source = format!("X:1\nM:{}\nK:C\nA\n", value);
        let mut ctx = AbcContext::new();
        let tokens = scan(&source, &mut ctx);
        let file = parse(tokens, &mut ctx);
        let mut found = None;
        file.walk(&mut |n| {
            if let Node::InfoLine { key, values, .. } = n {
                if key.lexeme.starts_with('M') && found.is_none() {
                    found = Some((key.clone(), values.clone()));
                }
            }
        });
        let (key, values) = found.expect("M: line present");
        let data = analyze(&key, &values, &mut ctx);
        (data, ctx)
    }

    #[test]
    fn test_common_and_cut_time() {
        let (data, _) = analyze_meter_line("C");
        assert_eq!(data, Some(SemanticData::Meter(MeterData::Common)));
        let (data, _) = analyze_meter_line("C|");
        assert_eq!(data, Some(SemanticData::Meter(MeterData::Cut)));
    }

    #[test]
    fn test_simple_fraction() {
        let (data, ctx) = analyze_meter_line("6/8");
        assert_eq!(
            data,
            Some(SemanticData::Meter(MeterData::Fractions(vec![
                Rational::new(6, 8)
            ])))
        );
        assert!(!ctx.reporter.has_errors());
    }

    #[test]
    fn test_compound_numerator_sums_left_to_right() {
        let (data, _) = analyze_meter_line("(2+3+2)/8");
        assert_eq!(
            data,
            Some(SemanticData::Meter(MeterData::Fractions(vec![
                Rational::new(7, 8)
            ])))
        );
    }

    #[test]
    fn test_multiple_fractions() {
        let (data, _) = analyze_meter_line("3/4 6/8");
        match data {
            Some(SemanticData::Meter(MeterData::Fractions(fs))) => assert_eq!(fs.len(), 2),
            other => panic!("expected fractions, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_meter_reports() {
        let (data, ctx) = analyze_meter_line("fast");
        assert!(data.is_none());
        assert!(ctx.reporter.has_errors());
    }

    #[test]
    fn test_unterminated_sum_reports() {
        let (data, ctx) = analyze_meter_line("(2+3/8");
        assert!(data.is_none());
        assert!(ctx.reporter.has_errors());
    }
}
