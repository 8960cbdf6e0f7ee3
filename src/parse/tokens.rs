//! Token types for ABC notation scanning
//!
//! Tokens are immutable once produced. Each carries a process-unique id
//! assigned by the compilation context, used to correlate AST nodes back
//! to source positions without re-scanning.

use serde::{Deserialize, Serialize};

/// Token kinds, covering header, body and directive scanning modes
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Header and structure
    /// Info-line key including the colon, e.g. "K:", "M:", "w:"
    InfoKey,
    /// Identifier-like run: header values, directive words, "F#", "bass"
    Identifier,
    /// Digit run (header fractions, body rhythms, tuplet ratios)
    Number,
    /// Quoted text in headers and directives
    Quoted,
    /// '=' in key=value modifiers
    Assign,
    /// '+' in compound meter numerators
    Plus,
    ParenOpen,
    ParenClose,
    /// '|' inside a header value (cut time "C|")
    Pipe,
    /// Measurement value with a trailing unit, e.g. "1.5cm" (directives)
    Unit,
    /// The "%%" that introduces a stylesheet directive
    DirectivePrefix,
    /// '%' line comment including the marker
    Comment,
    /// Free text (titles, composer lines, lyric content)
    Text,

    // Tune body
    /// A-G or a-g
    NoteLetter,
    /// ^ ^^ _ __ =
    Accidental,
    /// ' or , octave marks
    Octave,
    /// z or x single-measure rests
    Rest,
    /// Z or X multi-measure rests
    MultiMeasureRest,
    /// Run of '/' (rhythm shorthand)
    Slash,
    /// > >> < << broken rhythm markers
    BrokenRhythm,
    /// '-' tie
    Tie,
    SlurOpen,
    SlurClose,
    /// '(' immediately followed by a digit
    TupletOpen,
    /// ':' inside a tuplet ratio
    Colon,
    /// '[' opening a chord
    ChordOpen,
    /// ']' closing a chord or inline field
    BracketClose,
    /// '[' opening an inline header field, e.g. "[K:G]"
    InlineFieldOpen,
    /// "[1"-style repeat ending marker
    Volta,
    /// Bar line of any flavor; the lexeme distinguishes them
    Barline,
    GraceOpen,
    GraceClose,
    /// Single-character decoration: . ~ u v H-W
    Decoration,
    /// !symbol! decoration name including the bangs
    SymbolName,
    /// "text" annotation in the body
    Annotation,
    /// '&' voice overlay marker
    VoiceOverlay,
    /// 'y' invisible spacer
    Spacer,
    /// Trailing backslash line continuation
    Continuation,
    /// Invocation of a U:-declared symbol
    UserSymbol,
    /// Invocation of an m:-declared macro
    MacroName,

    Whitespace,
    Newline,
    /// Unrecognized character, kept so scanning never fails
    Discard,
    Eof,
}

/// A scanned token with its source position
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// 1-based source line
    pub line: usize,
    /// 1-based source column
    pub column: usize,
    /// Process-unique id from the compilation context
    pub id: u32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize, id: u32) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
            id,
        }
    }

    /// Column just past the end of the lexeme
    pub fn end_column(&self) -> usize {
        self.column + self.lexeme.chars().count()
    }
}
