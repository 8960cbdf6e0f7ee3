//! Transposition through the host-facing contract

use abc_core::api::transpose;
use abc_core::context::encode_position;
use abc_core::AbcError;

#[test]
fn test_whole_tune_up_a_major_second() {
    let out = transpose("X:1\nK:C\nCDEF|GABc|\n", 2, None).expect("transposes");
    assert_eq!(out, "X:1\nK:C\nDE^FG|AB^cd|\n");
}

#[test]
fn test_down_spells_flats() {
    let out = transpose("X:1\nK:C\nE|\n", -2, None).expect("transposes");
    assert_eq!(out, "X:1\nK:C\nD|\n");
    let out = transpose("X:1\nK:C\nE|\n", -1, None).expect("transposes");
    assert_eq!(out, "X:1\nK:C\n_E|\n");
}

#[test]
fn test_octave_shift_rewrites_registers() {
    let out = transpose("X:1\nK:C\nC c c'|\n", 12, None).expect("transposes");
    assert_eq!(out, "X:1\nK:C\nc c' c''|\n");
}

#[test]
fn test_range_limits_the_shift_to_one_line() {
    let source = "X:1\nK:C\nCCCC|\nDDDD|\n";
    let start = encode_position(3, 1);
    let end = encode_position(4, 1);
    let out = transpose(source, 2, Some((start, end))).expect("transposes");
    assert_eq!(out, "X:1\nK:C\nDDDD|\nDDDD|\n");
}

#[test]
fn test_rhythm_decorations_lyrics_untouched() {
    let out = transpose("X:1\nK:C\n.C2-C/ \"Am\"E|\nw:oh\n", 2, None).expect("transposes");
    assert_eq!(out, "X:1\nK:C\n.D2-D/ \"Am\"^F|\nw:oh\n");
}

#[test]
fn test_empty_range_rejected() {
    let err = transpose("X:1\nK:C\nA|\n", 2, Some((100, 100)));
    assert!(matches!(err, Err(AbcError::EmptyTransposeRange)));
}

#[test]
fn test_document_with_errors_rejected() {
    let err = transpose("X:1\nK:C\n[CEG|\n", 2, None);
    assert!(matches!(err, Err(AbcError::DocumentHasErrors(_))));
}
