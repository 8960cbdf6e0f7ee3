//! Semitone transposition over an optional source range
//!
//! Rewrites the pitch tokens of every note in range in place: letter,
//! accidental and octave marks are rebuilt from the shifted chromatic
//! value while the note's rhythm, ties and decorations stay untouched.
//! Token positions are left as they were; they still name where the
//! note came from in the original source.

use crate::context::encode_position;
use crate::error::AbcError;
use crate::models::ast::{FileStructure, Node};
use crate::models::AbcContext;
use crate::parse::tokens::{Token, TokenKind};

use super::{chromatic_value, spell};

/// Transpose every note in the document by the given number of
/// semitones, restricted to an optional `(start, end)` encoded-position
/// range (end-exclusive).
pub fn transpose_file(
    file: &mut FileStructure,
    semitones: i32,
    range: Option<(u64, u64)>,
    ctx: &mut AbcContext,
) -> Result<(), AbcError> {
    if let Some((start, end)) = range {
        if start >= end {
            return Err(AbcError::EmptyTransposeRange);
        }
    }
    if semitones == 0 {
        return Ok(());
    }

    let mut transposed = 0usize;
    let mut ids = Vec::new();
    file.walk_mut(&mut |node| {
        if !in_range(node, range) {
            return;
        }
        if transpose_node(node, semitones, ctx) {
            transposed += 1;
        } else if matches!(node, Node::Note { .. }) {
            ids.push(node.id());
        }
    });
    for id in ids {
        log::warn!("transpose: note {} has no chromatic value, left alone", id);
    }
    log::debug!("transposed {} note(s) by {}", transposed, semitones);
    Ok(())
}

/// Transpose a single note node in place. Returns false for nodes that
/// are not notes or carry an unreadable pitch.
pub fn transpose_node(node: &mut Node, semitones: i32, ctx: &mut AbcContext) -> bool {
    let value = match chromatic_value(node) {
        Some(v) => v,
        None => return false,
    };
    let shifted = value + semitones;
    let (new_letter, new_accidental) = spell(shifted, semitones > 0);
    let octave_number = shifted.div_euclid(12);

    if let Node::Note {
        accidental,
        letter,
        octaves,
        ..
    } = node
    {
        let (line, column) = (letter.line, letter.column);

        // Octave 0 is the uppercase register, octave 1 the lowercase one;
        // marks take it from there.
        let (letter_char, marks) = if octave_number >= 1 {
            (
                new_letter.to_ascii_lowercase(),
                "'".repeat((octave_number - 1) as usize),
            )
        } else {
            (new_letter, ",".repeat((-octave_number) as usize))
        };

        letter.lexeme = letter_char.to_string();
        *accidental = new_accidental.map(|acc| {
            Token::new(
                TokenKind::Accidental,
                acc.to_abc(),
                line,
                column,
                ctx.generate_id(),
            )
        });
        octaves.clear();
        if !marks.is_empty() {
            octaves.push(Token::new(
                TokenKind::Octave,
                marks,
                line,
                column,
                ctx.generate_id(),
            ));
        }
        true
    } else {
        false
    }
}

/// Whether a node's start position falls inside the encoded range
fn in_range(node: &Node, range: Option<(u64, u64)>) -> bool {
    let (start, end) = match range {
        Some(bounds) => bounds,
        None => return true,
    };
    match node.span() {
        Some(span) => {
            let position = encode_position(span.start_line, span.start_column);
            position >= start && position < end
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::stringify;
    use crate::parse::grammar::parse;
    use crate::parse::scanner::scan;

    fn transpose_source(source: &str, semitones: i32, range: Option<(u64, u64)>) -> String {
        let mut ctx = AbcContext::new();
        let tokens = scan(source, &mut ctx);
        let mut file = parse(tokens, &mut ctx);
        transpose_file(&mut file, semitones, range, &mut ctx).expect("transpose succeeds");
        stringify(&file)
    }

    #[test]
    fn test_up_two_semitones() {
        let out = transpose_source("X:1\nK:C\nCDEF|\n", 2, None);
        assert_eq!(out, "X:1\nK:C\nDE^FG|\n");
    }

    #[test]
    fn test_upward_spells_sharps_downward_flats() {
        let up = transpose_source("X:1\nK:C\nC|\n", 1, None);
        assert_eq!(up, "X:1\nK:C\n^C|\n");
        let down = transpose_source("X:1\nK:C\nC|\n", -1, None);
        assert_eq!(down, "X:1\nK:C\nB,|\n");
    }

    #[test]
    fn test_octave_wrap_up_into_lowercase() {
        // B up a semitone crosses into the lowercase register.
        let out = transpose_source("X:1\nK:C\nB|\n", 1, None);
        assert_eq!(out, "X:1\nK:C\nc|\n");
    }

    #[test]
    fn test_octave_marks_rebuilt() {
        let out = transpose_source("X:1\nK:C\nc'|\n", 12, None);
        assert_eq!(out, "X:1\nK:C\nc''|\n");
        let out = transpose_source("X:1\nK:C\nC,|\n", -12, None);
        assert_eq!(out, "X:1\nK:C\nC,,|\n");
    }

    #[test]
    fn test_existing_accidental_consumed() {
        // ^F up one semitone is G natural; the accidental disappears.
        let out = transpose_source("X:1\nK:C\n^F|\n", 1, None);
        assert_eq!(out, "X:1\nK:C\nG|\n");
    }

    #[test]
    fn test_rhythm_and_ties_untouched() {
        let out = transpose_source("X:1\nK:C\nC2-D/|\n", 2, None);
        assert_eq!(out, "X:1\nK:C\nD2-E/|\n");
    }

    #[test]
    fn test_range_restricts_transposition() {
        // Only line 3 columns [1,3) — the first note of the body.
        let start = encode_position(3, 1);
        let end = encode_position(3, 2);
        let out = transpose_source("X:1\nK:C\nC D|\n", 2, Some((start, end)));
        assert_eq!(out, "X:1\nK:C\nD D|\n");
    }

    #[test]
    fn test_empty_range_is_an_error() {
        let mut ctx = AbcContext::new();
        let tokens = scan("X:1\nK:C\nA|\n", &mut ctx);
        let mut file = parse(tokens, &mut ctx);
        let err = transpose_file(&mut file, 2, Some((500, 500)), &mut ctx);
        assert!(matches!(err, Err(AbcError::EmptyTransposeRange)));
    }

    #[test]
    fn test_chord_members_transpose() {
        let out = transpose_source("X:1\nK:C\n[CEG]|\n", 2, None);
        assert_eq!(out, "X:1\nK:C\n[D^FA]|\n");
    }

    #[test]
    fn test_zero_shift_is_identity() {
        let source = "X:1\nK:C\n^c'2 _B,|\n";
        assert_eq!(transpose_source(source, 0, None), source);
    }
}
