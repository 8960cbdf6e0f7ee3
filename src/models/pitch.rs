//! Pitch representation: letters, accidentals, modes, clefs, key signatures
//!
//! Chromatic arithmetic here backs both semantic analysis (deriving the
//! accidental list of a key) and transposition.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Accidental marking on a note or key root
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
}

impl Accidental {
    /// Parse a body accidental lexeme (^ ^^ _ __ =)
    pub fn from_abc(lexeme: &str) -> Option<Self> {
        match lexeme {
            "=" => Some(Accidental::Natural),
            "^" => Some(Accidental::Sharp),
            "_" => Some(Accidental::Flat),
            "^^" => Some(Accidental::DoubleSharp),
            "__" => Some(Accidental::DoubleFlat),
            _ => None,
        }
    }

    /// Body lexeme for this accidental
    pub fn to_abc(&self) -> &'static str {
        match self {
            Accidental::Natural => "=",
            Accidental::Sharp => "^",
            Accidental::Flat => "_",
            Accidental::DoubleSharp => "^^",
            Accidental::DoubleFlat => "__",
        }
    }

    /// Parse a key-root suffix (# or b, doubled)
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "#" => Some(Accidental::Sharp),
            "b" => Some(Accidental::Flat),
            "##" => Some(Accidental::DoubleSharp),
            "bb" => Some(Accidental::DoubleFlat),
            _ => None,
        }
    }

    pub fn semitone_offset(&self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::DoubleSharp => 2,
            Accidental::DoubleFlat => -2,
        }
    }
}

/// Chromatic value of a natural note letter, relative to C
pub fn letter_semitone(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Position of a natural note letter on the circle of fifths, relative to C
fn letter_fifths(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'F' => Some(-1),
        'C' => Some(0),
        'G' => Some(1),
        'D' => Some(2),
        'A' => Some(3),
        'E' => Some(4),
        'B' => Some(5),
        _ => None,
    }
}

/// Canonical modes, after case-insensitive normalization
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    /// K:none — no key signature at all
    NoKey,
    /// K:...exp — accidentals listed explicitly by the user
    Explicit,
}

static MODE_NAMES: Lazy<HashMap<&'static str, Mode>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for name in ["maj", "major", "ion", "ionian"] {
        table.insert(name, Mode::Major);
    }
    for name in ["m", "min", "minor", "aeo", "aeolian"] {
        table.insert(name, Mode::Minor);
    }
    for name in ["dor", "dorian"] {
        table.insert(name, Mode::Dorian);
    }
    for name in ["phr", "phrygian"] {
        table.insert(name, Mode::Phrygian);
    }
    for name in ["lyd", "lydian"] {
        table.insert(name, Mode::Lydian);
    }
    for name in ["mix", "mixolydian"] {
        table.insert(name, Mode::Mixolydian);
    }
    for name in ["loc", "locrian"] {
        table.insert(name, Mode::Locrian);
    }
    table.insert("none", Mode::NoKey);
    table.insert("exp", Mode::Explicit);
    table
});

impl Mode {
    /// Normalize a mode keyword case-insensitively ("Maj", "IONIAN" etc.)
    pub fn from_name(name: &str) -> Option<Self> {
        MODE_NAMES.get(name.to_ascii_lowercase().as_str()).copied()
    }

    /// Offset on the circle of fifths relative to the major mode on the
    /// same root
    fn fifths_offset(&self) -> i32 {
        match self {
            Mode::Major => 0,
            Mode::Mixolydian => -1,
            Mode::Dorian => -2,
            Mode::Minor => -3,
            Mode::Phrygian => -4,
            Mode::Locrian => -5,
            Mode::Lydian => 1,
            Mode::NoKey | Mode::Explicit => 0,
        }
    }

    pub fn canonical_name(&self) -> &'static str {
        match self {
            Mode::Major => "major",
            Mode::Minor => "minor",
            Mode::Dorian => "dorian",
            Mode::Phrygian => "phrygian",
            Mode::Lydian => "lydian",
            Mode::Mixolydian => "mixolydian",
            Mode::Locrian => "locrian",
            Mode::NoKey => "none",
            Mode::Explicit => "exp",
        }
    }
}

/// Clefs accepted in K: and V: modifiers
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
    Perc,
    None,
}

impl Clef {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "treble" | "g" => Some(Clef::Treble),
            "bass" | "f" => Some(Clef::Bass),
            "alto" | "c" => Some(Clef::Alto),
            "tenor" => Some(Clef::Tenor),
            "perc" => Some(Clef::Perc),
            "none" => Some(Clef::None),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
            Clef::Perc => "perc",
            Clef::None => "none",
        }
    }
}

/// Fully-resolved key signature
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeySignature {
    /// Root letter, uppercase (C, D, ... B)
    pub root: char,
    /// Accidental on the root, if marked
    pub accidental: Option<Accidental>,
    pub mode: Mode,
    /// Derived accidental list: which letters carry which accidental
    pub accidentals: Vec<(char, Accidental)>,
    /// Clef from a clef= modifier, if present
    pub clef: Option<Clef>,
    /// Remaining recognized key=value modifiers, verbatim
    pub modifiers: Vec<(String, String)>,
}

/// Sharp order on the circle of fifths
const SHARP_ORDER: [char; 7] = ['F', 'C', 'G', 'D', 'A', 'E', 'B'];
/// Flat order on the circle of fifths
const FLAT_ORDER: [char; 7] = ['B', 'E', 'A', 'D', 'G', 'C', 'F'];

impl KeySignature {
    /// Build a key signature, deriving the accidental list from root,
    /// root accidental and mode via the circle of fifths.
    pub fn new(root: char, accidental: Option<Accidental>, mode: Mode) -> Option<Self> {
        let mut fifths = letter_fifths(root)?;
        if let Some(acc) = accidental {
            fifths += 7 * acc.semitone_offset();
        }
        fifths += mode.fifths_offset();

        let accidentals = derive_accidentals(fifths, mode);
        Some(Self {
            root: root.to_ascii_uppercase(),
            accidental,
            mode,
            accidentals,
            clef: None,
            modifiers: Vec::new(),
        })
    }

    /// The default key: C major, no accidentals.
    pub fn default_key() -> Self {
        Self::new('C', None, Mode::Major).unwrap_or(Self {
            root: 'C',
            accidental: None,
            mode: Mode::Major,
            accidentals: Vec::new(),
            clef: None,
            modifiers: Vec::new(),
        })
    }

    /// Accidental in effect for a letter under this key, if any
    pub fn accidental_for(&self, letter: char) -> Option<Accidental> {
        let upper = letter.to_ascii_uppercase();
        self.accidentals
            .iter()
            .find(|(l, _)| *l == upper)
            .map(|(_, a)| *a)
    }
}

fn derive_accidentals(fifths: i32, mode: Mode) -> Vec<(char, Accidental)> {
    if matches!(mode, Mode::NoKey | Mode::Explicit) {
        return Vec::new();
    }
    // Beyond seven accidentals the key is theoretical; clamp rather than
    // invent double accidentals.
    let count = fifths.unsigned_abs().min(7) as usize;
    if fifths >= 0 {
        SHARP_ORDER[..count]
            .iter()
            .map(|&l| (l, Accidental::Sharp))
            .collect()
    } else {
        FLAT_ORDER[..count]
            .iter()
            .map(|&l| (l, Accidental::Flat))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_normalization_case_insensitive() {
        assert_eq!(Mode::from_name("Maj"), Some(Mode::Major));
        assert_eq!(Mode::from_name("IONIAN"), Some(Mode::Major));
        assert_eq!(Mode::from_name("dorian"), Some(Mode::Dorian));
        assert_eq!(Mode::from_name("m"), Some(Mode::Minor));
        assert_eq!(Mode::from_name("bogus"), None);
    }

    #[test]
    fn test_key_c_major_has_no_accidentals() {
        let key = KeySignature::new('C', None, Mode::Major).unwrap();
        assert!(key.accidentals.is_empty());
    }

    #[test]
    fn test_key_d_major_two_sharps() {
        let key = KeySignature::new('D', None, Mode::Major).unwrap();
        assert_eq!(
            key.accidentals,
            vec![('F', Accidental::Sharp), ('C', Accidental::Sharp)]
        );
    }

    #[test]
    fn test_key_f_major_one_flat() {
        let key = KeySignature::new('F', None, Mode::Major).unwrap();
        assert_eq!(key.accidentals, vec![('B', Accidental::Flat)]);
    }

    #[test]
    fn test_key_a_minor_matches_c_major() {
        let key = KeySignature::new('A', None, Mode::Minor).unwrap();
        assert!(key.accidentals.is_empty());
    }

    #[test]
    fn test_key_f_sharp_dorian() {
        // F# dorian = 4 sharps (same signature as E major)
        let key = KeySignature::new('F', Some(Accidental::Sharp), Mode::Dorian).unwrap();
        assert_eq!(key.accidentals.len(), 4);
        assert_eq!(key.accidentals[0], ('F', Accidental::Sharp));
        assert_eq!(key.accidental_for('d'), Some(Accidental::Sharp));
        assert_eq!(key.accidental_for('e'), None);
    }

    #[test]
    fn test_accidental_lexemes() {
        assert_eq!(Accidental::from_abc("^^"), Some(Accidental::DoubleSharp));
        assert_eq!(Accidental::from_abc("="), Some(Accidental::Natural));
        assert_eq!(Accidental::from_suffix("b"), Some(Accidental::Flat));
        assert_eq!(Accidental::Sharp.to_abc(), "^");
    }
}
