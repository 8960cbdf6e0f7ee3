//! abc-core: a front end for ABC music notation
//!
//! The pipeline runs scanner → parser → semantic analyzer, with the
//! context interpreter and the formatter both consuming the parsed tree.
//! Scanning and parsing never fail; problems surface as diagnostics on
//! the compilation context and as recovery nodes in the tree, so a
//! document with N independent mistakes yields N diagnostics and a
//! best-effort AST that still stringifies back to the original text.
//!
//! Typical use goes through the `api` module:
//!
//! ```
//! let result = abc_core::api::check("X:1\nK:G\nGABc|\n");
//! assert!(!result.has_errors);
//! ```

pub mod analysis;
pub mod api;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod models;
pub mod parse;
pub mod rational;
pub mod transposition;

pub use analysis::{analyze_directive, analyze_document, analyze_info_line, SemanticModel};
pub use context::{encode_position, interpret, DocumentSnapshots, Snapshot};
pub use diagnostics::{DiagnosticMark, DiagnosticSeverity, Diagnostics};
pub use error::AbcError;
pub use format::{format as format_document, stringify};
pub use models::{AbcContext, FileStructure, Node, System, Tune};
pub use parse::{parse, scan, Token, TokenKind};
pub use rational::Rational;
