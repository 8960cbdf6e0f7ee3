//! Data model for the ABC front end

pub mod ast;
pub mod barlines;
pub mod pitch;
pub mod semantics;

pub use ast::{FileStructure, Node, Rhythm, Span, System, Tune};
pub use barlines::BarlineType;
pub use pitch::{Accidental, Clef, KeySignature, Mode};
pub use semantics::{MeterData, SemanticData, TempoData, VoiceData};

use crate::diagnostics::Diagnostics;

/// Per-parse compilation context: the token/node id generator plus the
/// diagnostics reporter. Owned by exactly one parse and passed by mutable
/// reference into every stage; never shared across concurrent parses.
#[derive(Debug, Default)]
pub struct AbcContext {
    next_id: u32,
    pub reporter: Diagnostics,
}

impl AbcContext {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            reporter: Diagnostics::new(),
        }
    }

    /// Hand out the next process-unique id (monotonic within this context)
    pub fn generate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut ctx = AbcContext::new();
        let a = ctx.generate_id();
        let b = ctx.generate_id();
        let c = ctx.generate_id();
        assert!(a < b && b < c);
    }
}
