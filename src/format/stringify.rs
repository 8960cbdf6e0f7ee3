//! Lossless re-serialization
//!
//! Every token of the source survives in the AST, so stringification is
//! nothing more than concatenating lexemes in tree order. This is the
//! identity half of the formatter; canonical output lives in `format`.

use crate::models::ast::{FileStructure, Node};

/// Reproduce the exact source text of the document.
pub fn stringify(file: &FileStructure) -> String {
    file.tokens()
        .iter()
        .map(|t| t.lexeme.as_str())
        .collect()
}

/// Exact source text of a single node
pub fn stringify_node(node: &Node) -> String {
    let mut tokens = Vec::new();
    node.tokens(&mut tokens);
    tokens.iter().map(|t| t.lexeme.as_str()).collect()
}
