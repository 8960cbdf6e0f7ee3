//! Context interpretation over whole documents

use abc_core::api::parse_document;
use abc_core::models::pitch::{Accidental, Clef, Mode};
use abc_core::models::semantics::MeterData;
use abc_core::rational::Rational;

#[test]
fn test_key_with_mode_and_clef_reaches_the_body() {
    let parsed = parse_document("X:1\nK:F# dorian clef=bass\nFGAB|\n");
    let snap = parsed.snapshots.at(3, 1).expect("context in the body");
    assert_eq!(snap.key.root, 'F');
    assert_eq!(snap.key.accidental, Some(Accidental::Sharp));
    assert_eq!(snap.key.mode, Mode::Dorian);
    assert_eq!(snap.key.accidentals.len(), 4, "F# dorian carries 4 sharps");
    assert_eq!(snap.clef, Clef::Bass);
}

#[test]
fn test_compound_meter_sums_to_seven_eighths() {
    let parsed = parse_document("X:1\nM:(2+3+2)/8\nK:C\nCDE FGA B|\n");
    let snap = parsed.snapshots.at(4, 1).expect("context in the body");
    match &snap.meter {
        MeterData::Fractions(fractions) => {
            assert_eq!(fractions, &vec![Rational::new(7, 8)]);
        }
        other => panic!("expected fractions, got {:?}", other),
    }
    assert_eq!(snap.meter.bar_length(), Rational::new(7, 8));
}

#[test]
fn test_snapshot_positions_monotonic_across_tunes() {
    let parsed = parse_document(
        "X:1\nM:3/4\nK:G\nAB[K:D]cd|\n[M:6/8]ef|\n\nX:2\nQ:1/4=100\nK:F\nGG|\n",
    );
    let positions: Vec<u64> = parsed.snapshots.iter().map(|s| s.position).collect();
    assert!(!positions.is_empty());
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "snapshot positions must increase");
}

#[test]
fn test_right_continuous_lookup() {
    let parsed = parse_document("X:1\nK:C\nAB[K:G]cd|\n");
    // Right-continuity: exactly at the inline field's position the new
    // key is already in effect.
    let field = parsed
        .snapshots
        .iter()
        .find(|s| s.key.root == 'G')
        .expect("key change snapshot");
    let at_change = parsed
        .snapshots
        .at_position(field.position)
        .expect("lookup at the change position");
    assert_eq!(at_change.key.root, 'G');
}

#[test]
fn test_voice_auto_discovery_from_body() {
    let parsed = parse_document("X:1\nK:C\n[V:lead]CDEF|\n[V:harmony]E4|\n");
    assert_eq!(
        parsed.snapshots.voices,
        vec!["lead".to_string(), "harmony".to_string()],
        "body-only voices are discovered"
    );
}

#[test]
fn test_empty_document_has_no_context() {
    let parsed = parse_document("% nothing but a comment\n");
    assert!(parsed.snapshots.is_empty());
    assert!(parsed.snapshots.at(1, 1).is_none());
}
