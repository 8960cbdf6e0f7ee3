//! Context-sensitive token scanner for ABC notation
//!
//! One left-to-right pass with an explicit scan mode: the same characters
//! lex differently in a tune header, a tune body, or a directive. A token,
//! once emitted, is final. Scanning never fails for any input; the worst
//! case is a `Discard` token for an unrecognized character.

use crate::diagnostics::{DiagnosticMark, DiagnosticSeverity};
use crate::models::AbcContext;

use super::tokens::{Token, TokenKind};

/// Current structural region of the document
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanMode {
    /// Before the first tune or between tunes
    FreeText,
    /// Between an X: line and the terminating K: line
    TuneHeader,
    /// After the K: line, until a blank line
    TuneBody,
}

/// Info keys whose value is free text rather than a tokenized expression
const FREE_TEXT_KEYS: [char; 13] = [
    'T', 'C', 'O', 'A', 'B', 'D', 'F', 'H', 'N', 'R', 'S', 'Z', 'W',
];

pub struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    mode: ScanMode,
    macros: Vec<String>,
    user_symbols: Vec<char>,
    tokens: Vec<Token>,
    ctx: &'a mut AbcContext,
}

/// Scan source text into a flat, position-tagged token stream.
pub fn scan(source: &str, ctx: &mut AbcContext) -> Vec<Token> {
    Scanner::new(source, ctx).run()
}

impl<'a> Scanner<'a> {
    fn new(source: &str, ctx: &'a mut AbcContext) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            mode: ScanMode::FreeText,
            macros: Vec::new(),
            user_symbols: Vec::new(),
            tokens: Vec::new(),
            ctx,
        }
    }

    fn run(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.scan_line();
        }
        self.emit(TokenKind::Eof, String::new(), self.line, self.col);
        self.tokens
    }

    // ------------------------------------------------------------------
    // Line dispatch
    // ------------------------------------------------------------------

    fn scan_line(&mut self) {
        if self.line_is_blank() {
            self.scan_blank_line();
            if self.mode != ScanMode::FreeText {
                log::debug!("scanner: blank line at {} ends tune", self.line);
                self.mode = ScanMode::FreeText;
            }
            return;
        }

        if self.peek() == '%' {
            if self.peek_at(1) == Some('%') {
                self.scan_directive();
            } else {
                self.scan_comment();
            }
            self.scan_newline();
            return;
        }

        if let Some(key) = self.line_info_key() {
            self.scan_info_line(key);
            self.scan_newline();
            return;
        }

        match self.mode {
            ScanMode::TuneBody => self.scan_body_line(),
            ScanMode::FreeText | ScanMode::TuneHeader => self.scan_text_line(),
        }
        self.scan_newline();
    }

    /// Blank line: whitespace tokens then the newline
    fn scan_blank_line(&mut self) {
        self.scan_inline_whitespace();
        self.scan_newline();
    }

    /// Free text outside a tune body (typeset text, stray header content)
    fn scan_text_line(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while !self.is_at_end() && self.peek() != '\n' && self.peek() != '%' {
            text.push(self.advance());
        }
        if !text.is_empty() {
            self.emit(TokenKind::Text, text, line, col);
        }
        if !self.is_at_end() && self.peek() == '%' {
            self.scan_comment();
        }
    }

    // ------------------------------------------------------------------
    // Info lines
    // ------------------------------------------------------------------

    /// The info-line key letter, if the current line starts with one
    fn line_info_key(&self) -> Option<char> {
        let c = self.peek();
        if c.is_ascii_alphabetic() && self.peek_at(1) == Some(':') {
            Some(c)
        } else {
            None
        }
    }

    fn scan_info_line(&mut self, key: char) {
        if key == 'X' && self.mode == ScanMode::FreeText {
            self.mode = ScanMode::TuneHeader;
        }

        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        lexeme.push(self.advance()); // key letter
        lexeme.push(self.advance()); // ':'
        self.emit(TokenKind::InfoKey, lexeme, line, col);
        let value_start = self.tokens.len();

        if key == 'w' || key == 'W' {
            self.scan_lyric_value();
        } else if FREE_TEXT_KEYS.contains(&key) {
            self.scan_text_value();
        } else {
            self.scan_header_value(None);
        }

        match key {
            'K' => {
                // K: terminates the tune header and enters the body.
                if self.mode == ScanMode::TuneHeader {
                    self.mode = ScanMode::TuneBody;
                }
            }
            'm' => self.register_macro(value_start),
            'U' => self.register_user_symbol(value_start),
            _ => {}
        }
    }

    /// Lyric content stays a single raw text token; syllable splitting is
    /// not a scanning concern
    fn scan_lyric_value(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while !self.is_at_end() && self.peek() != '\n' {
            text.push(self.advance());
        }
        if !text.is_empty() {
            self.emit(TokenKind::Text, text, line, col);
        }
    }

    /// Free text value (titles etc.), stopping at a line comment
    fn scan_text_value(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        while !self.is_at_end() && self.peek() != '\n' && self.peek() != '%' {
            text.push(self.advance());
        }
        if !text.is_empty() {
            self.emit(TokenKind::Text, text, line, col);
        }
        if !self.is_at_end() && self.peek() == '%' {
            self.scan_comment();
        }
    }

    /// Tokenized header value (K:, M:, L:, Q:, V:, ...). When `stop` is
    /// given, scanning also ends before that character (inline fields
    /// stop at ']').
    fn scan_header_value(&mut self, stop: Option<char>) {
        while !self.is_at_end() {
            let c = self.peek();
            if c == '\n' || Some(c) == stop {
                return;
            }
            let (line, col) = (self.line, self.col);
            match c {
                '%' => {
                    self.scan_comment();
                    return;
                }
                ' ' | '\t' => self.scan_inline_whitespace(),
                '"' => self.scan_quoted(TokenKind::Quoted),
                '=' => {
                    self.advance();
                    self.emit(TokenKind::Assign, "=", line, col);
                }
                '/' => {
                    self.advance();
                    self.emit(TokenKind::Slash, "/", line, col);
                }
                '(' => {
                    self.advance();
                    self.emit(TokenKind::ParenOpen, "(", line, col);
                }
                ')' => {
                    self.advance();
                    self.emit(TokenKind::ParenClose, ")", line, col);
                }
                '+' => {
                    self.advance();
                    self.emit(TokenKind::Plus, "+", line, col);
                }
                '|' => {
                    self.advance();
                    self.emit(TokenKind::Pipe, "|", line, col);
                }
                '!' => self.scan_symbol_name(),
                '0'..='9' => self.scan_number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_header_identifier(),
                _ => {
                    let bad = self.advance();
                    self.emit(TokenKind::Discard, bad.to_string(), line, col);
                }
            }
        }
    }

    /// Identifier in a header value. The continue set includes '#' for
    /// key roots like "F#" and octave marks for middle= values like "B,".
    fn scan_header_identifier(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        lexeme.push(self.advance());
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '#' | '\'' | ',') {
                lexeme.push(self.advance());
            } else {
                break;
            }
        }
        self.emit(TokenKind::Identifier, lexeme, line, col);
    }

    fn register_macro(&mut self, value_start: usize) {
        // The macro name is the first identifier of the m: line value.
        if let Some(token) = self.tokens[value_start..]
            .iter()
            .find(|t| t.kind == TokenKind::Identifier)
        {
            let name = token.lexeme.clone();
            if !self.macros.contains(&name) {
                log::debug!("scanner: macro '{}' registered", name);
                self.macros.push(name);
            }
        }
    }

    fn register_user_symbol(&mut self, value_start: usize) {
        if let Some(token) = self.tokens[value_start..]
            .iter()
            .find(|t| t.kind == TokenKind::Identifier)
        {
            if let Some(symbol) = token.lexeme.chars().next() {
                if token.lexeme.chars().count() == 1 && !self.user_symbols.contains(&symbol) {
                    log::debug!("scanner: user symbol '{}' registered", symbol);
                    self.user_symbols.push(symbol);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------

    /// Scan a %%key value... stylesheet directive. Terminated by a bare
    /// comment sign or end of line.
    fn scan_directive(&mut self) {
        let (line, col) = (self.line, self.col);
        self.advance();
        self.advance();
        self.emit(TokenKind::DirectivePrefix, "%%", line, col);

        // Directive key
        let (line, col) = (self.line, self.col);
        let mut key = String::new();
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                key.push(self.advance());
            } else {
                break;
            }
        }
        if !key.is_empty() {
            self.emit(TokenKind::Identifier, key, line, col);
        }

        // Directive values
        while !self.is_at_end() && self.peek() != '\n' {
            let (line, col) = (self.line, self.col);
            match self.peek() {
                '%' => {
                    self.scan_comment();
                    return;
                }
                ' ' | '\t' => self.scan_inline_whitespace(),
                '"' => self.scan_quoted(TokenKind::Quoted),
                '=' => {
                    self.advance();
                    self.emit(TokenKind::Assign, "=", line, col);
                }
                '^' => {
                    self.advance();
                    self.emit(TokenKind::Accidental, "^", line, col);
                }
                '0'..='9' => self.scan_directive_number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_header_identifier(),
                _ => {
                    let bad = self.advance();
                    self.emit(TokenKind::Discard, bad.to_string(), line, col);
                }
            }
        }
    }

    /// A directive number, possibly with a decimal point and a measurement
    /// unit attached with no separating whitespace ("1.5cm")
    fn scan_directive_number(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            lexeme.push(self.advance());
        }
        if !self.is_at_end()
            && self.peek() == '.'
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            lexeme.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                lexeme.push(self.advance());
            }
        }
        let mut kind = TokenKind::Number;
        if !self.is_at_end() && self.peek().is_ascii_alphabetic() {
            kind = TokenKind::Unit;
            while !self.is_at_end() && self.peek().is_ascii_alphabetic() {
                lexeme.push(self.advance());
            }
        }
        self.emit(kind, lexeme, line, col);
    }

    // ------------------------------------------------------------------
    // Tune body
    // ------------------------------------------------------------------

    fn scan_body_line(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            let (line, col) = (self.line, self.col);
            let c = self.peek();

            if self.try_scan_macro_invocation() {
                continue;
            }
            if self.user_symbols.contains(&c) {
                self.advance();
                self.emit(TokenKind::UserSymbol, c.to_string(), line, col);
                continue;
            }

            match c {
                ' ' | '\t' => self.scan_inline_whitespace(),
                '%' => {
                    self.scan_comment();
                    return;
                }
                '\\' if self.rest_of_line_blank_after(1) => {
                    self.advance();
                    self.emit(TokenKind::Continuation, "\\", line, col);
                }
                '|' | ':' => self.scan_barline_or_colon(),
                '[' => self.scan_left_bracket(),
                ']' => {
                    self.advance();
                    self.emit(TokenKind::BracketClose, "]", line, col);
                }
                '{' => {
                    self.advance();
                    self.emit(TokenKind::GraceOpen, "{", line, col);
                }
                '}' => {
                    self.advance();
                    self.emit(TokenKind::GraceClose, "}", line, col);
                }
                '(' => {
                    self.advance();
                    if !self.is_at_end() && self.peek().is_ascii_digit() {
                        self.emit(TokenKind::TupletOpen, "(", line, col);
                    } else {
                        self.emit(TokenKind::SlurOpen, "(", line, col);
                    }
                }
                ')' => {
                    self.advance();
                    self.emit(TokenKind::SlurClose, ")", line, col);
                }
                '"' => self.scan_quoted(TokenKind::Annotation),
                '!' => self.scan_symbol_name(),
                '^' | '_' | '=' => self.scan_accidental(),
                'A'..='G' | 'a'..='g' => {
                    self.advance();
                    self.emit(TokenKind::NoteLetter, c.to_string(), line, col);
                }
                'z' | 'x' => {
                    self.advance();
                    self.emit(TokenKind::Rest, c.to_string(), line, col);
                }
                'Z' | 'X' => {
                    self.advance();
                    self.emit(TokenKind::MultiMeasureRest, c.to_string(), line, col);
                }
                'y' => {
                    self.advance();
                    self.emit(TokenKind::Spacer, "y", line, col);
                }
                '0'..='9' => self.scan_number(),
                '/' => self.scan_run('/', TokenKind::Slash),
                '>' => self.scan_run('>', TokenKind::BrokenRhythm),
                '<' => self.scan_run('<', TokenKind::BrokenRhythm),
                '-' => {
                    self.advance();
                    self.emit(TokenKind::Tie, "-", line, col);
                }
                '\'' | ',' => {
                    self.advance();
                    self.emit(TokenKind::Octave, c.to_string(), line, col);
                }
                '.' | '~' | 'u' | 'v' | 'H'..='W' => {
                    self.advance();
                    self.emit(TokenKind::Decoration, c.to_string(), line, col);
                }
                '&' => {
                    self.advance();
                    self.emit(TokenKind::VoiceOverlay, "&", line, col);
                }
                _ => {
                    // Unrecognized character degrades to a discard token
                    // rather than halting the scan.
                    let bad = self.advance();
                    self.emit(TokenKind::Discard, bad.to_string(), line, col);
                }
            }
        }
    }

    /// Longest-match check against registered macro names
    fn try_scan_macro_invocation(&mut self) -> bool {
        if self.macros.is_empty() {
            return false;
        }
        let mut best: Option<String> = None;
        for name in &self.macros {
            let len = name.chars().count();
            if self.lookahead_matches(name) && best.as_ref().map_or(true, |b| b.chars().count() < len)
            {
                best = Some(name.clone());
            }
        }
        if let Some(name) = best {
            let (line, col) = (self.line, self.col);
            for _ in name.chars() {
                self.advance();
            }
            self.emit(TokenKind::MacroName, name, line, col);
            true
        } else {
            false
        }
    }

    fn scan_barline_or_colon(&mut self) {
        let (line, col) = (self.line, self.col);
        let lexeme = if self.lookahead_matches(":|:") {
            ":|:"
        } else if self.lookahead_matches(":|") {
            ":|"
        } else if self.lookahead_matches("::") {
            "::"
        } else if self.lookahead_matches("|]") {
            "|]"
        } else if self.lookahead_matches("||") {
            "||"
        } else if self.lookahead_matches("|:") {
            "|:"
        } else if self.peek() == '|' {
            "|"
        } else {
            // Bare colon: tuplet ratio separator.
            self.advance();
            self.emit(TokenKind::Colon, ":", line, col);
            return;
        };
        for _ in lexeme.chars() {
            self.advance();
        }
        self.emit(TokenKind::Barline, lexeme, line, col);
    }

    fn scan_left_bracket(&mut self) {
        let (line, col) = (self.line, self.col);
        match self.peek_at(1) {
            Some('|') => {
                self.advance();
                self.advance();
                self.emit(TokenKind::Barline, "[|", line, col);
            }
            Some(c) if c.is_ascii_digit() => {
                // Repeat ending: [1 or [1,3
                let mut lexeme = String::from(self.advance());
                while !self.is_at_end() && (self.peek().is_ascii_digit() || self.peek() == ',') {
                    lexeme.push(self.advance());
                }
                self.emit(TokenKind::Volta, lexeme, line, col);
            }
            Some(c) if c.is_ascii_alphabetic() && self.peek_at(2) == Some(':') => {
                // Inline field like [K:G]
                self.advance();
                self.emit(TokenKind::InlineFieldOpen, "[", line, col);
                let (kline, kcol) = (self.line, self.col);
                let mut key = String::new();
                key.push(self.advance());
                key.push(self.advance());
                self.emit(TokenKind::InfoKey, key, kline, kcol);
                self.scan_header_value(Some(']'));
                if !self.is_at_end() && self.peek() == ']' {
                    let (cline, ccol) = (self.line, self.col);
                    self.advance();
                    self.emit(TokenKind::BracketClose, "]", cline, ccol);
                }
            }
            _ => {
                self.advance();
                self.emit(TokenKind::ChordOpen, "[", line, col);
            }
        }
    }

    fn scan_accidental(&mut self) {
        let (line, col) = (self.line, self.col);
        let c = self.advance();
        let mut lexeme = c.to_string();
        if (c == '^' || c == '_') && !self.is_at_end() && self.peek() == c {
            lexeme.push(self.advance());
        }
        self.emit(TokenKind::Accidental, lexeme, line, col);
    }

    fn scan_symbol_name(&mut self) {
        let (line, col) = (self.line, self.col);
        let start = self.pos;
        let mut lexeme = String::from(self.advance()); // '!'
        while !self.is_at_end() && self.peek() != '!' && self.peek() != '\n' {
            lexeme.push(self.advance());
        }
        if !self.is_at_end() && self.peek() == '!' {
            lexeme.push(self.advance());
            self.emit(TokenKind::SymbolName, lexeme, line, col);
        } else {
            // Unterminated: discard only the opening bang, rescan the rest.
            self.pos = start + 1;
            self.col = col + 1;
            self.ctx.reporter.add(
                DiagnosticMark::new(
                    line,
                    col,
                    DiagnosticSeverity::Warning,
                    "unterminated_symbol",
                    "'!' without a closing '!'",
                ),
            );
            self.emit(TokenKind::Discard, "!", line, col);
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    fn scan_quoted(&mut self, kind: TokenKind) {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::from(self.advance()); // opening quote
        while !self.is_at_end() && self.peek() != '"' && self.peek() != '\n' {
            lexeme.push(self.advance());
        }
        if !self.is_at_end() && self.peek() == '"' {
            lexeme.push(self.advance());
        } else {
            self.ctx.reporter.add(DiagnosticMark::new(
                line,
                col,
                DiagnosticSeverity::Warning,
                "unterminated_quote",
                "quoted text without a closing quote",
            ));
        }
        self.emit(kind, lexeme, line, col);
    }

    fn scan_number(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            lexeme.push(self.advance());
        }
        self.emit(TokenKind::Number, lexeme, line, col);
    }

    fn scan_run(&mut self, c: char, kind: TokenKind) {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        while !self.is_at_end() && self.peek() == c {
            lexeme.push(self.advance());
        }
        self.emit(kind, lexeme, line, col);
    }

    fn scan_inline_whitespace(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        while !self.is_at_end() && matches!(self.peek(), ' ' | '\t') {
            lexeme.push(self.advance());
        }
        if !lexeme.is_empty() {
            self.emit(TokenKind::Whitespace, lexeme, line, col);
        }
    }

    fn scan_comment(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        while !self.is_at_end() && self.peek() != '\n' {
            lexeme.push(self.advance());
        }
        self.emit(TokenKind::Comment, lexeme, line, col);
    }

    fn scan_newline(&mut self) {
        if self.is_at_end() {
            return;
        }
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        if self.peek() == '\r' {
            lexeme.push(self.advance());
        }
        if !self.is_at_end() && self.peek() == '\n' {
            lexeme.push(self.advance());
            self.emit(TokenKind::Newline, lexeme, line, col);
            self.line += 1;
            self.col = 1;
        } else if !lexeme.is_empty() {
            self.emit(TokenKind::Discard, lexeme, line, col);
        }
    }

    fn line_is_blank(&self) -> bool {
        let mut i = self.pos;
        while i < self.chars.len() {
            match self.chars[i] {
                ' ' | '\t' | '\r' => i += 1,
                '\n' => return true,
                _ => return false,
            }
        }
        true
    }

    fn rest_of_line_blank_after(&self, offset: usize) -> bool {
        let mut i = self.pos + offset;
        while i < self.chars.len() {
            match self.chars[i] {
                ' ' | '\t' | '\r' => i += 1,
                '\n' => return true,
                _ => return false,
            }
        }
        true
    }

    fn lookahead_matches(&self, text: &str) -> bool {
        let mut i = self.pos;
        for c in text.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn peek(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> char {
        let c = self.chars.get(self.pos).copied().unwrap_or('\0');
        self.pos += 1;
        if c != '\n' {
            self.col += 1;
        }
        c
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn emit(&mut self, kind: TokenKind, lexeme: impl Into<String>, line: usize, col: usize) {
        let id = self.ctx.generate_id();
        self.tokens.push(Token::new(kind, lexeme, line, col, id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut ctx = AbcContext::new();
        scan(source, &mut ctx).iter().map(|t| t.kind).collect()
    }

    fn scan_all(source: &str) -> (Vec<Token>, AbcContext) {
        let mut ctx = AbcContext::new();
        let tokens = scan(source, &mut ctx);
        (tokens, ctx)
    }

    #[test]
    fn test_scan_minimal_tune() {
        let (tokens, ctx) = scan_all("X:1\nK:C\nCDEF|\n");
        assert!(!ctx.reporter.has_errors());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::InfoKey,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::InfoKey,
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::NoteLetter,
                TokenKind::NoteLetter,
                TokenKind::NoteLetter,
                TokenKind::NoteLetter,
                TokenKind::Barline,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_letters_lex_by_mode() {
        // In the header, C is an identifier; in the body it is a note.
        let (tokens, _) = scan_all("X:1\nK:C\nC\n");
        let c_tokens: Vec<_> = tokens.iter().filter(|t| t.lexeme == "C").collect();
        assert_eq!(c_tokens[0].kind, TokenKind::Identifier);
        assert_eq!(c_tokens[1].kind, TokenKind::NoteLetter);
    }

    #[test]
    fn test_scan_accidentals_and_octaves() {
        let (tokens, _) = scan_all("X:1\nK:C\n^c' _B, =e\n");
        let body: Vec<_> = tokens
            .iter()
            .filter(|t| t.line == 3 && t.kind != TokenKind::Whitespace)
            .collect();
        assert_eq!(body[0].kind, TokenKind::Accidental);
        assert_eq!(body[0].lexeme, "^");
        assert_eq!(body[1].kind, TokenKind::NoteLetter);
        assert_eq!(body[2].kind, TokenKind::Octave);
        assert_eq!(body[2].lexeme, "'");
        assert_eq!(body[3].lexeme, "_");
        assert_eq!(body[5].lexeme, ",");
    }

    #[test]
    fn test_scan_barlines() {
        let (tokens, _) = scan_all("X:1\nK:C\n|: A :| B || C |]\n");
        let bars: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Barline)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(bars, vec!["|:", ":|", "||", "|]"]);
    }

    #[test]
    fn test_tuplet_open_vs_slur_open() {
        let (tokens, _) = scan_all("X:1\nK:C\n(3ABC (AB)\n");
        let parens: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::TupletOpen | TokenKind::SlurOpen))
            .map(|t| t.kind)
            .collect();
        assert_eq!(parens, vec![TokenKind::TupletOpen, TokenKind::SlurOpen]);
    }

    #[test]
    fn test_scan_directive_with_units() {
        let (tokens, _) = scan_all("%%pagewidth 21cm\n");
        assert_eq!(tokens[0].kind, TokenKind::DirectivePrefix);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "pagewidth");
        let unit = tokens.iter().find(|t| t.kind == TokenKind::Unit).unwrap();
        assert_eq!(unit.lexeme, "21cm");
    }

    #[test]
    fn test_directive_assignment() {
        let (tokens, _) = scan_all("%%staffsep width=40\n");
        let kinds: Vec<_> = tokens
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Newline | TokenKind::Eof))
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::DirectivePrefix,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_unrecognized_char_becomes_discard() {
        let (tokens, ctx) = scan_all("X:1\nK:C\nA\u{00e9}B\n");
        assert!(!ctx.reporter.has_errors());
        let discard = tokens.iter().find(|t| t.kind == TokenKind::Discard).unwrap();
        assert_eq!(discard.lexeme, "\u{00e9}");
        // Scanning continued past the bad character.
        let letters = tokens.iter().filter(|t| t.kind == TokenKind::NoteLetter).count();
        assert_eq!(letters, 2);
    }

    #[test]
    fn test_inline_field() {
        let (tokens, _) = scan_all("X:1\nK:C\nA[K:G]B\n");
        let kinds: Vec<_> = tokens.iter().filter(|t| t.line == 3).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::NoteLetter,
                TokenKind::InlineFieldOpen,
                TokenKind::InfoKey,
                TokenKind::Identifier,
                TokenKind::BracketClose,
                TokenKind::NoteLetter,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_chord_open_is_not_inline_field() {
        let (tokens, _) = scan_all("X:1\nK:C\n[CEG]\n");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::ChordOpen));
        assert!(!tokens.iter().any(|t| t.kind == TokenKind::InlineFieldOpen));
    }

    #[test]
    fn test_volta_bracket() {
        let (tokens, _) = scan_all("X:1\nK:C\nA|[1 B:|[2 C|]\n");
        let voltas: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Volta)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(voltas, vec!["[1", "[2"]);
    }

    #[test]
    fn test_user_symbol_registration() {
        let (tokens, _) = scan_all("X:1\nU:T = !trill!\nK:C\nTA\n");
        let sym = tokens.iter().find(|t| t.kind == TokenKind::UserSymbol);
        assert!(sym.is_some(), "T should lex as a user symbol after U:T");
        assert_eq!(sym.unwrap().lexeme, "T");
    }

    #[test]
    fn test_macro_invocation() {
        let (tokens, _) = scan_all("X:1\nm:n4 = A/B/\nK:C\nn4 C\n");
        let mac = tokens.iter().find(|t| t.kind == TokenKind::MacroName);
        assert!(mac.is_some(), "n4 should lex as a macro invocation");
        assert_eq!(mac.unwrap().lexeme, "n4");
    }

    #[test]
    fn test_blank_line_ends_body_mode() {
        let source = "X:1\nK:C\nABC\n\nX:2\nK:D\nDEF\n";
        let tokens = {
            let mut ctx = AbcContext::new();
            scan(source, &mut ctx)
        };
        // The second X: line lexes as an info key, not free text.
        let info_keys: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::InfoKey)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(info_keys, vec!["X:", "K:", "X:", "K:"]);
    }

    #[test]
    fn test_lexeme_concatenation_reproduces_source() {
        let source = "X:1\nT:Round Trip % yes\nM:(2+3)/8\nK:F# dorian clef=bass\n^c'2 de|[CEG]3/2 z/ (3abc|\n";
        let (tokens, _) = scan_all(source);
        let rebuilt: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_scanning_never_fails_on_garbage() {
        let (tokens, _) = scan_all("\u{0000}\u{fffd}\t |]]}{ %%\nX:\n");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_broken_rhythm_runs() {
        let (tokens, _) = scan_all("X:1\nK:C\nA>>B C<D\n");
        let brs: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::BrokenRhythm)
            .map(|t| t.lexeme.as_str())
            .collect();
        assert_eq!(brs, vec![">>", "<"]);
    }

    #[test]
    fn test_kinds_helper_smoke() {
        assert!(kinds("").contains(&TokenKind::Eof));
    }
}
