//! Hard error type for programmer-error and contract violations
//!
//! Recoverable conditions (bad characters, malformed lines) never surface
//! here; they go to the diagnostics reporter. `AbcError` covers the cases
//! where a caller violated a contract, such as formatting a document that
//! failed `check` or analyzing a node that is not an info line.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AbcError {
    /// Analysis was invoked on a node that is not an info line or directive.
    #[error("node is not an info line or directive")]
    NotAnalyzable,

    /// A semantically-sensitive operation was requested on a document that
    /// still carries parse errors.
    #[error("document has {0} parse error(s); run check() first")]
    DocumentHasErrors(usize),

    /// Transposition was requested over a range that selects no notes.
    #[error("no notes in the requested range")]
    EmptyTransposeRange,

    /// A host-facing payload failed to serialize.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
