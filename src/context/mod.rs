//! Positional context interpretation
//!
//! Walks the analyzed document in order and emits a snapshot whenever a
//! tracked field changes (key, meter, note length, clef, active voice).
//! Defaults layer: hard-coded constants, overridden by file-header lines,
//! overridden by tune-header lines, overridden by body fields in document
//! order. Lookup is right-continuous: the snapshot in effect at a
//! position is the last one at or before it.

use serde::{Deserialize, Serialize};

use crate::analysis::SemanticModel;
use crate::models::ast::{FileStructure, Node};
use crate::models::pitch::{Clef, KeySignature};
use crate::models::semantics::MeterData;
use crate::models::{AbcContext, SemanticData};
use crate::rational::Rational;

/// Collapse line and column into one totally ordered position.
/// Lines never reach 10_000 columns in practice, so ordering by the
/// encoded value matches ordering by (line, column).
pub const POSITION_BASE: u64 = 10_000;

pub fn encode_position(line: usize, column: usize) -> u64 {
    line as u64 * POSITION_BASE + column as u64
}

/// State in effect at one document position
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub position: u64,
    pub key: KeySignature,
    pub meter: MeterData,
    pub note_length: Rational,
    pub clef: Clef,
    pub voice_id: Option<String>,
}

/// Ordered, position-indexed snapshot sequence for a whole document.
/// Built once per parse, queried read-only, rebuilt wholesale on
/// re-parse.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DocumentSnapshots {
    snapshots: Vec<Snapshot>,
    /// Voice ids in order of first appearance, declared or discovered
    pub voices: Vec<String>,
}

impl DocumentSnapshots {
    /// Last snapshot at or before the given encoded position. A query
    /// before the first snapshot (or on an empty document) is `None`:
    /// "not parsed to this point" is distinct from "default context".
    pub fn at_position(&self, position: u64) -> Option<&Snapshot> {
        let index = self
            .snapshots
            .partition_point(|s| s.position <= position);
        index.checked_sub(1).map(|i| &self.snapshots[i])
    }

    pub fn at(&self, line: usize, column: usize) -> Option<&Snapshot> {
        self.at_position(encode_position(line, column))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    fn push_if_changed(&mut self, snapshot: Snapshot) {
        match self.snapshots.last_mut() {
            Some(last) if last.position == snapshot.position => *last = snapshot,
            Some(last)
                if last.key == snapshot.key
                    && last.meter == snapshot.meter
                    && last.note_length == snapshot.note_length
                    && last.clef == snapshot.clef
                    && last.voice_id == snapshot.voice_id => {}
            _ => self.snapshots.push(snapshot),
        }
    }

    fn discover_voice(&mut self, id: &str) {
        if !self.voices.iter().any(|v| v == id) {
            log::debug!("context: voice '{}' discovered", id);
            self.voices.push(id.to_string());
        }
    }
}

/// Running state while interpreting; flushed into a snapshot on change
#[derive(Clone)]
struct Layer {
    key: KeySignature,
    meter: MeterData,
    note_length: Option<Rational>,
    clef: Clef,
    voice_id: Option<String>,
}

impl Layer {
    fn base() -> Self {
        Self {
            key: KeySignature::default_key(),
            meter: MeterData::Common,
            note_length: None,
            clef: Clef::Treble,
            voice_id: None,
        }
    }

    /// Effective note length: explicit L: wins, otherwise derived from
    /// the meter
    fn effective_note_length(&self) -> Rational {
        self.note_length
            .unwrap_or_else(|| self.meter.default_note_length())
    }

    fn apply(&mut self, data: &SemanticData) {
        match data {
            SemanticData::Key(sig) => {
                if let Some(clef) = sig.clef {
                    self.clef = clef;
                }
                self.key = sig.clone();
            }
            SemanticData::Meter(meter) => self.meter = meter.clone(),
            SemanticData::NoteLength(length) => self.note_length = Some(*length),
            SemanticData::Voice(voice) => {
                if let Some(clef) = voice.clef {
                    self.clef = clef;
                }
                self.voice_id = Some(voice.id.clone());
            }
            _ => {}
        }
    }

    fn snapshot_at(&self, position: u64) -> Snapshot {
        Snapshot {
            position,
            key: self.key.clone(),
            meter: self.meter.clone(),
            note_length: self.effective_note_length(),
            clef: self.clef,
            voice_id: self.voice_id.clone(),
        }
    }
}

/// Interpret the document into its snapshot sequence.
pub fn interpret(
    file: &FileStructure,
    model: &SemanticModel,
    _ctx: &mut AbcContext,
) -> DocumentSnapshots {
    let mut snapshots = DocumentSnapshots::default();

    // File-header layer: directives and stray info lines before any tune.
    let mut file_layer = Layer::base();
    for node in &file.header {
        apply_node(node, model, &mut file_layer, &mut snapshots);
    }

    for tune in &file.tunes {
        let mut layer = file_layer.clone();
        for node in &tune.header {
            apply_node(node, model, &mut layer, &mut snapshots);
            if let Some(position) = node_position(node) {
                snapshots.push_if_changed(layer.snapshot_at(position));
            }
        }
        for system in &tune.body {
            for node in &system.elements {
                apply_node(node, model, &mut layer, &mut snapshots);
                match node {
                    Node::InfoLine { .. } | Node::InlineField { .. } => {
                        if let Some(position) = node_position(node) {
                            snapshots.push_if_changed(layer.snapshot_at(position));
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    log::debug!(
        "context: {} snapshot(s), {} voice(s)",
        snapshots.len(),
        snapshots.voices.len()
    );
    snapshots
}

fn apply_node(
    node: &Node,
    model: &SemanticModel,
    layer: &mut Layer,
    snapshots: &mut DocumentSnapshots,
) {
    match node {
        Node::InfoLine { .. } | Node::InlineField { .. } => {
            if let Some(data) = model.get(node.id()) {
                layer.apply(data);
                if let SemanticData::Voice(voice) = data {
                    snapshots.discover_voice(&voice.id);
                }
            } else if let Some(id) = raw_voice_id(node) {
                // A V: field too malformed to analyze still switches and
                // discovers the voice, so alignment stays per-voice.
                snapshots.discover_voice(&id);
                layer.voice_id = Some(id);
            }
        }
        Node::Directive { .. } => {
            if let Some(data) = model.get(node.id()) {
                layer.apply(data);
            }
        }
        _ => {}
    }
}

/// Voice id straight from the tokens of an unanalyzed V: field
fn raw_voice_id(node: &Node) -> Option<String> {
    let (key, values) = match node {
        Node::InfoLine { key, values, .. } | Node::InlineField { key, values, .. } => {
            (key, values)
        }
        _ => return None,
    };
    if !key.lexeme.starts_with('V') {
        return None;
    }
    values
        .iter()
        .find(|t| {
            matches!(
                t.kind,
                crate::parse::tokens::TokenKind::Identifier | crate::parse::tokens::TokenKind::Number
            )
        })
        .map(|t| t.lexeme.clone())
}

fn node_position(node: &Node) -> Option<u64> {
    node.span()
        .map(|span| encode_position(span.start_line, span.start_column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_document;
    use crate::parse::grammar::parse;
    use crate::parse::scanner::scan;

    fn snapshots_for(source: &str) -> DocumentSnapshots {
        let mut ctx = AbcContext::new();
        let tokens = scan(source, &mut ctx);
        let file = parse(tokens, &mut ctx);
        let model = analyze_document(&file, &mut ctx);
        interpret(&file, &model, &mut ctx)
    }

    #[test]
    fn test_empty_document_yields_no_context() {
        let snapshots = snapshots_for("% just a comment\n");
        assert!(snapshots.is_empty());
        assert_eq!(snapshots.at(1, 1), None);
    }

    #[test]
    fn test_query_before_first_snapshot_is_none() {
        let snapshots = snapshots_for("X:1\nK:D\nABC\n");
        assert!(!snapshots.is_empty());
        assert_eq!(snapshots.at_position(0), None);
        assert!(snapshots.at(1, 1).is_some(), "first snapshot sits at the X: line");
    }

    #[test]
    fn test_header_state_reaches_the_body() {
        let snapshots = snapshots_for("X:1\nM:6/8\nL:1/16\nK:D\nABC\n");
        let snap = snapshots.at(5, 1).expect("context in the body");
        assert_eq!(snap.key.root, 'D');
        assert_eq!(
            snap.meter,
            MeterData::Fractions(vec![Rational::new(3, 4)])
        );
        assert_eq!(snap.note_length, Rational::new(1, 16));
    }

    #[test]
    fn test_note_length_defaults_from_meter() {
        // 2/4 is below 3/4 so the default unit is 1/16.
        let snapshots = snapshots_for("X:1\nM:2/4\nK:C\nA\n");
        let snap = snapshots.at(4, 1).expect("context in the body");
        assert_eq!(snap.note_length, Rational::new(1, 16));

        let snapshots = snapshots_for("X:1\nM:4/4\nK:C\nA\n");
        let snap = snapshots.at(4, 1).expect("context in the body");
        assert_eq!(snap.note_length, Rational::new(1, 8));
    }

    #[test]
    fn test_inline_field_changes_key_mid_body() {
        let snapshots = snapshots_for("X:1\nK:C\nAB[K:G]cd\n");
        let before = snapshots.at(3, 1).expect("context at line start");
        assert_eq!(before.key.root, 'C');
        let after = snapshots.at(3, 9).expect("context after the field");
        assert_eq!(after.key.root, 'G');
    }

    #[test]
    fn test_positions_are_monotonic() {
        let snapshots =
            snapshots_for("X:1\nM:3/4\nK:G\nAB[K:D]cd|\n[M:6/8]ef|\n\nX:2\nK:F\nGG\n");
        let positions: Vec<u64> = snapshots.iter().map(|s| s.position).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted, "snapshot positions must be ordered");
    }

    #[test]
    fn test_voice_switch_and_discovery() {
        let snapshots = snapshots_for("X:1\nV:A\nK:C\n[V:A]CD\n[V:B]EF\n");
        assert_eq!(snapshots.voices, vec!["A".to_string(), "B".to_string()]);
        let in_b = snapshots.at(5, 6).expect("context inside voice B");
        assert_eq!(in_b.voice_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_second_tune_resets_to_file_defaults() {
        let snapshots = snapshots_for("X:1\nM:6/8\nK:D\nAB\n\nX:2\nK:C\nCD\n");
        let in_second = snapshots.at(8, 1).expect("context in tune 2");
        assert_eq!(in_second.key.root, 'C');
        assert_eq!(in_second.meter, MeterData::Common, "M: does not leak across tunes");
    }

    #[test]
    fn test_position_encoding_orders_line_then_column() {
        assert!(encode_position(2, 1) > encode_position(1, 80));
        assert!(encode_position(3, 10) > encode_position(3, 9));
    }
}
