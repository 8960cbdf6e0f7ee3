//! Abstract syntax tree for ABC documents
//!
//! The node set is a closed tagged union; every traversal matches
//! exhaustively so adding a node kind is compiler-checked. Nodes own their
//! children by value and carry no parent pointers; lookups by id or range
//! are full-tree walks over an on-demand index, never stored back-references.
//! Every node keeps all of its tokens, which is what makes `stringify` a
//! lossless identity.

use serde::{Deserialize, Serialize};

use super::barlines::BarlineType;
use crate::parse::tokens::Token;

/// Rhythm suffix of a note or chord: optional numerator, slash run,
/// denominator, and a trailing broken-rhythm marker.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Rhythm {
    pub numerator: Option<Token>,
    pub slashes: Option<Token>,
    pub denominator: Option<Token>,
    pub broken: Option<Token>,
}

impl Rhythm {
    pub fn is_empty(&self) -> bool {
        self.numerator.is_none()
            && self.slashes.is_none()
            && self.denominator.is_none()
            && self.broken.is_none()
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Token>) {
        if let Some(t) = &self.numerator {
            out.push(t);
        }
        if let Some(t) = &self.slashes {
            out.push(t);
        }
        if let Some(t) = &self.denominator {
            out.push(t);
        }
        if let Some(t) = &self.broken {
            out.push(t);
        }
    }
}

/// Source span of a node or token, 1-based, end-exclusive in columns
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

/// The closed set of AST node variants
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Node {
    /// A KEY:value header line; values stay tokenized, semantic analysis
    /// turns them into typed records without mutating the tree
    InfoLine {
        id: u32,
        key: Token,
        values: Vec<Token>,
    },
    /// w: lyric line
    Lyrics {
        id: u32,
        key: Token,
        values: Vec<Token>,
    },
    /// %%key value stylesheet directive
    Directive {
        id: u32,
        prefix: Token,
        key: Token,
        values: Vec<Token>,
    },
    /// % line comment
    Comment { id: u32, token: Token },
    /// Free text outside tune bodies (typeset text, stray header content)
    Text { id: u32, token: Token },
    Note {
        id: u32,
        decorations: Vec<Token>,
        accidental: Option<Token>,
        letter: Token,
        octaves: Vec<Token>,
        rhythm: Option<Rhythm>,
        tie: Option<Token>,
    },
    Rest {
        id: u32,
        token: Token,
        rhythm: Option<Rhythm>,
    },
    /// Z or X measure rest; duration math treats it as infinite
    MultiMeasureRest {
        id: u32,
        token: Token,
        count: Option<Token>,
    },
    Chord {
        id: u32,
        decorations: Vec<Token>,
        open: Token,
        elements: Vec<Node>,
        close: Option<Token>,
        rhythm: Option<Rhythm>,
        tie: Option<Token>,
    },
    /// Notes/chords grouped by adjacency (no intervening whitespace)
    Beam { id: u32, elements: Vec<Node> },
    /// (p, (p:q, (p:q:r. Unspecified q/r stay None; defaulting is the
    /// formatter's concern, not the parser's.
    Tuplet {
        id: u32,
        tokens: Vec<Token>,
        p: u32,
        q: Option<u32>,
        r: Option<u32>,
    },
    GraceGroup {
        id: u32,
        open: Token,
        /// Leading slash marking the zero-duration acciaccatura variant
        slash: Option<Token>,
        elements: Vec<Node>,
        close: Option<Token>,
    },
    Barline {
        id: u32,
        kind: BarlineType,
        token: Token,
    },
    /// "[1"-style repeat ending
    Volta { id: u32, token: Token },
    VoiceOverlay { id: u32, token: Token },
    /// Inline bracketed header field in the body, e.g. [K:G]
    InlineField {
        id: u32,
        open: Token,
        key: Token,
        values: Vec<Token>,
        close: Option<Token>,
    },
    /// "text" annotation attached at this point in the music
    Annotation { id: u32, token: Token },
    /// Slur open or close parenthesis
    Slur { id: u32, token: Token },
    /// Decoration not attached to a following note (e.g. end of line)
    Decoration { id: u32, token: Token },
    MacroDecl {
        id: u32,
        key: Token,
        values: Vec<Token>,
    },
    MacroInvocation { id: u32, token: Token },
    UserSymbolDecl {
        id: u32,
        key: Token,
        values: Vec<Token>,
    },
    UserSymbolInvocation { id: u32, token: Token },
    Whitespace { id: u32, token: Token },
    Newline { id: u32, token: Token },
    Continuation { id: u32, token: Token },
    Spacer { id: u32, token: Token },
    /// Recovery placeholder: the offending tokens of a malformed region
    ErrorExpr { id: u32, tokens: Vec<Token> },
}

impl Node {
    pub fn id(&self) -> u32 {
        match self {
            Node::InfoLine { id, .. }
            | Node::Lyrics { id, .. }
            | Node::Directive { id, .. }
            | Node::Comment { id, .. }
            | Node::Text { id, .. }
            | Node::Note { id, .. }
            | Node::Rest { id, .. }
            | Node::MultiMeasureRest { id, .. }
            | Node::Chord { id, .. }
            | Node::Beam { id, .. }
            | Node::Tuplet { id, .. }
            | Node::GraceGroup { id, .. }
            | Node::Barline { id, .. }
            | Node::Volta { id, .. }
            | Node::VoiceOverlay { id, .. }
            | Node::InlineField { id, .. }
            | Node::Annotation { id, .. }
            | Node::Slur { id, .. }
            | Node::Decoration { id, .. }
            | Node::MacroDecl { id, .. }
            | Node::MacroInvocation { id, .. }
            | Node::UserSymbolDecl { id, .. }
            | Node::UserSymbolInvocation { id, .. }
            | Node::Whitespace { id, .. }
            | Node::Newline { id, .. }
            | Node::Continuation { id, .. }
            | Node::Spacer { id, .. }
            | Node::ErrorExpr { id, .. } => *id,
        }
    }

    /// Pre-order walk: the node itself, then its children
    pub fn walk(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        match self {
            Node::Chord { elements, .. }
            | Node::Beam { elements, .. }
            | Node::GraceGroup { elements, .. } => {
                for child in elements {
                    child.walk(f);
                }
            }
            _ => {}
        }
    }

    /// Mutable pre-order walk
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        match self {
            Node::Chord { elements, .. }
            | Node::Beam { elements, .. }
            | Node::GraceGroup { elements, .. } => {
                for child in elements {
                    child.walk_mut(f);
                }
            }
            _ => {}
        }
    }

    /// Collect every token of this node, in source order
    pub fn tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match self {
            Node::InfoLine { key, values, .. }
            | Node::Lyrics { key, values, .. }
            | Node::MacroDecl { key, values, .. }
            | Node::UserSymbolDecl { key, values, .. } => {
                out.push(key);
                out.extend(values.iter());
            }
            Node::Directive {
                prefix, key, values, ..
            } => {
                out.push(prefix);
                out.push(key);
                out.extend(values.iter());
            }
            Node::Comment { token, .. }
            | Node::Text { token, .. }
            | Node::Volta { token, .. }
            | Node::VoiceOverlay { token, .. }
            | Node::Annotation { token, .. }
            | Node::Slur { token, .. }
            | Node::Decoration { token, .. }
            | Node::MacroInvocation { token, .. }
            | Node::UserSymbolInvocation { token, .. }
            | Node::Whitespace { token, .. }
            | Node::Newline { token, .. }
            | Node::Continuation { token, .. }
            | Node::Spacer { token, .. }
            | Node::Barline { token, .. } => out.push(token),
            Node::Note {
                decorations,
                accidental,
                letter,
                octaves,
                rhythm,
                tie,
                ..
            } => {
                out.extend(decorations.iter());
                if let Some(t) = accidental {
                    out.push(t);
                }
                out.push(letter);
                out.extend(octaves.iter());
                if let Some(r) = rhythm {
                    r.collect(out);
                }
                if let Some(t) = tie {
                    out.push(t);
                }
            }
            Node::Rest { token, rhythm, .. } => {
                out.push(token);
                if let Some(r) = rhythm {
                    r.collect(out);
                }
            }
            Node::MultiMeasureRest { token, count, .. } => {
                out.push(token);
                if let Some(t) = count {
                    out.push(t);
                }
            }
            Node::Chord {
                decorations,
                open,
                elements,
                close,
                rhythm,
                tie,
                ..
            } => {
                out.extend(decorations.iter());
                out.push(open);
                for child in elements {
                    child.tokens(out);
                }
                if let Some(t) = close {
                    out.push(t);
                }
                if let Some(r) = rhythm {
                    r.collect(out);
                }
                if let Some(t) = tie {
                    out.push(t);
                }
            }
            Node::Beam { elements, .. } => {
                for child in elements {
                    child.tokens(out);
                }
            }
            Node::Tuplet { tokens, .. } | Node::ErrorExpr { tokens, .. } => {
                out.extend(tokens.iter());
            }
            Node::GraceGroup {
                open,
                slash,
                elements,
                close,
                ..
            } => {
                out.push(open);
                if let Some(t) = slash {
                    out.push(t);
                }
                for child in elements {
                    child.tokens(out);
                }
                if let Some(t) = close {
                    out.push(t);
                }
            }
            Node::InlineField {
                open,
                key,
                values,
                close,
                ..
            } => {
                out.push(open);
                out.push(key);
                out.extend(values.iter());
                if let Some(t) = close {
                    out.push(t);
                }
            }
        }
    }

    /// Source span covered by this node's tokens
    pub fn span(&self) -> Option<Span> {
        let mut tokens = Vec::new();
        self.tokens(&mut tokens);
        let first = tokens.first()?;
        let last = tokens.last()?;
        Some(Span {
            start_line: first.line,
            start_column: first.column,
            end_line: last.line,
            end_column: last.end_column(),
        })
    }

    /// True for elements that participate in beams/duration math
    pub fn is_note_like(&self) -> bool {
        matches!(
            self,
            Node::Note { .. }
                | Node::Rest { .. }
                | Node::Chord { .. }
                | Node::GraceGroup { .. }
                | Node::Beam { .. }
        )
    }
}

/// One line of music across the active voice
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct System {
    pub id: u32,
    pub elements: Vec<Node>,
}

impl System {
    /// Voice id if this system starts with a V: info line or [V:..] field
    pub fn leading_voice(&self) -> Option<String> {
        for el in &self.elements {
            match el {
                Node::Whitespace { .. } | Node::Newline { .. } => continue,
                Node::InfoLine { key, values, .. } | Node::InlineField { key, values, .. }
                    if key.lexeme.starts_with("V:") || key.lexeme.starts_with('V') =>
                {
                    return values
                        .iter()
                        .find(|t| !t.lexeme.trim().is_empty())
                        .map(|t| t.lexeme.trim().to_string());
                }
                _ => return None,
            }
        }
        None
    }
}

/// One tune: header lines up to and including K:, then body systems
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tune {
    pub id: u32,
    pub header: Vec<Node>,
    pub body: Vec<System>,
    /// Blank lines, comments and stray trivia after the body, up to the
    /// next tune
    pub trailer: Vec<Node>,
}

/// A whole parsed document: optional file header, then tunes
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FileStructure {
    pub id: u32,
    /// Directives, comments and blank lines before the first tune
    pub header: Vec<Node>,
    pub tunes: Vec<Tune>,
}

impl FileStructure {
    /// Walk every node in document order
    pub fn walk(&self, f: &mut impl FnMut(&Node)) {
        for node in &self.header {
            node.walk(f);
        }
        for tune in &self.tunes {
            for node in &tune.header {
                node.walk(f);
            }
            for system in &tune.body {
                for node in &system.elements {
                    node.walk(f);
                }
            }
            for node in &tune.trailer {
                node.walk(f);
            }
        }
    }

    /// Mutable walk in document order
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        for node in &mut self.header {
            node.walk_mut(f);
        }
        for tune in &mut self.tunes {
            for node in &mut tune.header {
                node.walk_mut(f);
            }
            for system in &mut tune.body {
                for node in &mut system.elements {
                    node.walk_mut(f);
                }
            }
            for node in &mut tune.trailer {
                node.walk_mut(f);
            }
        }
    }

    /// Every token of the document in source order
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        for node in &self.header {
            node.tokens(&mut out);
        }
        for tune in &self.tunes {
            for node in &tune.header {
                node.tokens(&mut out);
            }
            for system in &tune.body {
                for node in &system.elements {
                    node.tokens(&mut out);
                }
            }
            for node in &tune.trailer {
                node.tokens(&mut out);
            }
        }
        out
    }

    /// Find a node by id via a full-tree walk (no stored parent links)
    pub fn find_node(&self, id: u32) -> Option<Node> {
        let mut found = None;
        self.walk(&mut |node| {
            if found.is_none() && node.id() == id {
                found = Some(node.clone());
            }
        });
        found
    }

    /// Source span of the node with the given id
    pub fn node_span(&self, id: u32) -> Option<Span> {
        self.find_node(id).and_then(|n| n.span())
    }

    /// Whether any ErrorExpr survives in the tree
    pub fn has_error_nodes(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node| {
            if matches!(node, Node::ErrorExpr { .. }) {
                found = true;
            }
        });
        found
    }
}
