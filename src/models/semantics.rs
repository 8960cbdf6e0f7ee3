//! Typed semantic records produced from info lines and directives
//!
//! One variant per line/directive kind. Produced by the semantic analyzer
//! from raw `InfoLine`/`Directive` nodes; the AST itself is never mutated.

use serde::{Deserialize, Serialize};

use super::pitch::{Clef, KeySignature};
use crate::rational::Rational;

/// Meter forms accepted on an M: line
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum MeterData {
    /// C — common time, 4/4
    Common,
    /// C| — cut time, 2/2
    Cut,
    /// One or more fractions; compound numerators like (2+3)/8 are already
    /// summed left-to-right
    Fractions(Vec<Rational>),
}

impl MeterData {
    /// Total bar length implied by this meter
    pub fn bar_length(&self) -> Rational {
        match self {
            MeterData::Common => Rational::new(4, 4),
            MeterData::Cut => Rational::new(2, 2),
            MeterData::Fractions(fractions) => fractions
                .iter()
                .fold(Rational::zero(), |acc, f| acc.add(f)),
        }
    }

    /// Default unit note length derived from the meter: 1/16 below 3/4,
    /// 1/8 at or above
    pub fn default_note_length(&self) -> Rational {
        if self.bar_length().compare(&Rational::new(3, 4)) == std::cmp::Ordering::Less {
            Rational::new(1, 16)
        } else {
            Rational::new(1, 8)
        }
    }
}

/// Q: tempo line
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TempoData {
    /// Quoted text before the duration=bpm pair
    pub leading_text: Option<String>,
    /// Beat duration being counted, e.g. 1/4
    pub duration: Option<Rational>,
    /// Beats per minute
    pub bpm: Option<u32>,
    /// Quoted text after the pair
    pub trailing_text: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StemDirection {
    Up,
    Down,
    Auto,
}

impl StemDirection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "up" => Some(StemDirection::Up),
            "down" => Some(StemDirection::Down),
            "auto" => Some(StemDirection::Auto),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChordPlacement {
    Above,
    Below,
}

/// Bracket/brace grouping continuation state on a V: line
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StaffGrouping {
    BracketStart,
    BracketContinue,
    BracketEnd,
    BraceStart,
    BraceContinue,
    BraceEnd,
}

/// V: voice declaration with its standard property set.
/// Each property is independently validated; an out-of-domain value fails
/// the whole line with a reported diagnostic.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VoiceData {
    pub id: String,
    pub name: Option<String>,
    pub clef: Option<Clef>,
    pub transpose: Option<i32>,
    pub octave: Option<i32>,
    pub middle: Option<String>,
    pub stafflines: Option<u32>,
    pub staffscale: Option<f64>,
    pub perc: bool,
    pub instrument: Option<u32>,
    pub merge: bool,
    pub stem: Option<StemDirection>,
    pub gchord: Option<ChordPlacement>,
    pub space: Option<f64>,
    pub grouping: Option<StaffGrouping>,
}

impl VoiceData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            clef: None,
            transpose: None,
            octave: None,
            middle: None,
            stafflines: None,
            staffscale: None,
            perc: false,
            instrument: None,
            merge: false,
            stem: None,
            gchord: None,
            space: None,
            grouping: None,
        }
    }
}

/// show/hide mode of the voice-visibility directive
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityMode {
    Show,
    Hide,
}

impl VisibilityMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "show" => Some(VisibilityMode::Show),
            "hide" => Some(VisibilityMode::Hide),
            _ => None,
        }
    }
}

/// %%MIDI directive. The subcommand is normalized case-insensitively,
/// a deliberate divergence from reference implementations that pass it
/// through case-sensitively.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MidiData {
    pub subcommand: String,
    pub values: Vec<String>,
}

/// Tagged union of all analyzed line/directive payloads
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum SemanticData {
    Key(KeySignature),
    Meter(MeterData),
    NoteLength(Rational),
    Tempo(TempoData),
    Voice(VoiceData),
    Title(String),
    Composer(String),
    TuneNumber(u32),
    VoiceVisibility {
        mode: VisibilityMode,
        voices: Vec<String>,
    },
    Midi(MidiData),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_bar_length() {
        let meter = MeterData::Fractions(vec![Rational::new(6, 8)]);
        assert_eq!(meter.bar_length(), Rational::new(3, 4));
        assert_eq!(MeterData::Common.bar_length(), Rational::one());
    }

    #[test]
    fn test_default_note_length_threshold() {
        let narrow = MeterData::Fractions(vec![Rational::new(2, 4)]);
        assert_eq!(narrow.default_note_length(), Rational::new(1, 16));
        let wide = MeterData::Fractions(vec![Rational::new(4, 4)]);
        assert_eq!(wide.default_note_length(), Rational::new(1, 8));
    }

    #[test]
    fn test_visibility_mode_case_insensitive() {
        assert_eq!(VisibilityMode::from_name("Show"), Some(VisibilityMode::Show));
        assert_eq!(VisibilityMode::from_name("HIDE"), Some(VisibilityMode::Hide));
        assert_eq!(VisibilityMode::from_name("toggle"), None);
    }
}
