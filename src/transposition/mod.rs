//! Chromatic pitch arithmetic for transposition
//!
//! A note's absolute chromatic value combines its letter semitone, its
//! accidental, and its octave (uppercase letters sit in octave 0,
//! lowercase one above, with `'` and `,` marks shifting further).
//! Spelling after a shift comes from a direction-dependent lookup table:
//! upward shifts spell black keys with sharps, downward shifts with
//! flats.

pub mod transpose;

pub use transpose::{transpose_file, transpose_node};

use crate::models::ast::Node;
use crate::models::pitch::{letter_semitone, Accidental};

/// Sharp spellings of the twelve pitch classes
const SHARP_SPELLINGS: [(char, Option<Accidental>); 12] = [
    ('C', None),
    ('C', Some(Accidental::Sharp)),
    ('D', None),
    ('D', Some(Accidental::Sharp)),
    ('E', None),
    ('F', None),
    ('F', Some(Accidental::Sharp)),
    ('G', None),
    ('G', Some(Accidental::Sharp)),
    ('A', None),
    ('A', Some(Accidental::Sharp)),
    ('B', None),
];

/// Flat spellings of the twelve pitch classes
const FLAT_SPELLINGS: [(char, Option<Accidental>); 12] = [
    ('C', None),
    ('D', Some(Accidental::Flat)),
    ('D', None),
    ('E', Some(Accidental::Flat)),
    ('E', None),
    ('F', None),
    ('G', Some(Accidental::Flat)),
    ('G', None),
    ('A', Some(Accidental::Flat)),
    ('A', None),
    ('B', Some(Accidental::Flat)),
    ('B', None),
];

/// Spelling for a pitch class, chosen by shift direction
pub(crate) fn spell(pitch_class: i32, upward: bool) -> (char, Option<Accidental>) {
    let index = pitch_class.rem_euclid(12) as usize;
    if upward {
        SHARP_SPELLINGS[index]
    } else {
        FLAT_SPELLINGS[index]
    }
}

/// Absolute chromatic value of a note node, relative to middle C's
/// octave. Uppercase letters are octave 0, lowercase octave 1; each `'`
/// raises and each `,` lowers by an octave.
pub(crate) fn chromatic_value(node: &Node) -> Option<i32> {
    let (accidental, letter, octaves) = match node {
        Node::Note {
            accidental,
            letter,
            octaves,
            ..
        } => (accidental, letter, octaves),
        _ => return None,
    };
    let letter_char = letter.lexeme.chars().next()?;
    let mut value = letter_semitone(letter_char)?;
    if letter_char.is_ascii_lowercase() {
        value += 12;
    }
    if let Some(acc) = accidental {
        value += Accidental::from_abc(&acc.lexeme)?.semitone_offset();
    }
    for mark in octaves {
        for c in mark.lexeme.chars() {
            match c {
                '\'' => value += 12,
                ',' => value -= 12,
                _ => {}
            }
        }
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharp_and_flat_spellings() {
        assert_eq!(spell(1, true), ('C', Some(Accidental::Sharp)));
        assert_eq!(spell(1, false), ('D', Some(Accidental::Flat)));
        assert_eq!(spell(4, true), ('E', None));
        assert_eq!(spell(-1, true), ('B', None), "wraps below zero");
    }
}
