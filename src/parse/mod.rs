//! Scanning and parsing for ABC notation
//!
//! `scanner` turns source text into a flat token stream; `grammar` builds
//! the typed AST from it. Both report recoverable problems through the
//! compilation context instead of failing.

pub mod grammar;
pub mod scanner;
pub mod tokens;

pub use grammar::parse;
pub use scanner::scan;
pub use tokens::{Token, TokenKind};
