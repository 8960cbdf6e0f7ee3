//! Barline classification
//!
//! Bar lines partition voices into bars for the alignment pass and act as
//! resynchronization points for parser error recovery.

use serde::{Deserialize, Serialize};

/// Barline types and handling
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarlineType {
    Single,       // |
    Double,       // ||
    Final,        // |]
    SectionStart, // [|
    StartRepeat,  // |:
    EndRepeat,    // :|
    DoubleRepeat, // :: or :|:
}

impl BarlineType {
    /// Parse barline from its lexeme
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "|" => Some(BarlineType::Single),
            "||" => Some(BarlineType::Double),
            "|]" => Some(BarlineType::Final),
            "[|" => Some(BarlineType::SectionStart),
            "|:" => Some(BarlineType::StartRepeat),
            ":|" => Some(BarlineType::EndRepeat),
            "::" | ":|:" => Some(BarlineType::DoubleRepeat),
            _ => None,
        }
    }

    /// Canonical lexeme for this barline
    pub fn lexeme(&self) -> &'static str {
        match self {
            BarlineType::Single => "|",
            BarlineType::Double => "||",
            BarlineType::Final => "|]",
            BarlineType::SectionStart => "[|",
            BarlineType::StartRepeat => "|:",
            BarlineType::EndRepeat => ":|",
            BarlineType::DoubleRepeat => "::",
        }
    }

    /// True when this barline opens or closes a repeated section
    pub fn is_repeat(&self) -> bool {
        matches!(
            self,
            BarlineType::StartRepeat | BarlineType::EndRepeat | BarlineType::DoubleRepeat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_barlines() {
        assert_eq!(BarlineType::parse("|"), Some(BarlineType::Single));
        assert_eq!(BarlineType::parse("||"), Some(BarlineType::Double));
        assert_eq!(BarlineType::parse("|]"), Some(BarlineType::Final));
        assert_eq!(BarlineType::parse("[|"), Some(BarlineType::SectionStart));
        assert_eq!(BarlineType::parse("|:"), Some(BarlineType::StartRepeat));
        assert_eq!(BarlineType::parse(":|"), Some(BarlineType::EndRepeat));
        assert_eq!(BarlineType::parse("::"), Some(BarlineType::DoubleRepeat));
    }

    #[test]
    fn test_parse_rejects_non_barlines() {
        assert_eq!(BarlineType::parse(":"), None);
        assert_eq!(BarlineType::parse("A"), None);
    }

    #[test]
    fn test_repeat_classification() {
        assert!(BarlineType::StartRepeat.is_repeat());
        assert!(!BarlineType::Single.is_repeat());
    }
}
