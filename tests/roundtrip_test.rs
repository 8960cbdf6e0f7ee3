//! Round-trip identity: stringify(parse(scan(text))) == text

use abc_core::format::stringify;
use abc_core::models::AbcContext;
use abc_core::parse::{parse, scan};

fn assert_roundtrip(source: &str) {
    let mut ctx = AbcContext::new();
    let tokens = scan(source, &mut ctx);
    let file = parse(tokens, &mut ctx);
    assert_eq!(
        stringify(&file),
        source,
        "round-trip must reproduce the source exactly"
    );
}

#[test]
fn test_roundtrip_full_tune() {
    assert_roundtrip(
        "X:1\nT:Cooley's\nM:4/4\nL:1/8\nQ:1/4=120\nK:Edor\n\
         |:D2|EB{c}BA B2 EB|~B2 AB dBAG|FDAD BDAD|FDAD dAFD|\n\
         EBBA B2 EB|B2 AB defg|afe^c dBAF|DEFD E2:|\n",
    );
}

#[test]
fn test_roundtrip_file_header_and_two_tunes() {
    assert_roundtrip(
        "%%pagewidth 21cm\n% collection header\n\nX:1\nK:C\nCDEF|\n\nX:2\nK:D\nDEFG|]\n",
    );
}

#[test]
fn test_roundtrip_multi_voice_with_inline_fields() {
    assert_roundtrip(
        "X:1\nM:2/4\nK:G\nV:1\nV:2\n[V:1]GABc|d2 g2|\n[V:2]G,2 B,2|D2 G,2|\n",
    );
}

#[test]
fn test_roundtrip_lyrics_and_annotations() {
    assert_roundtrip("X:1\nK:C\n\"Am\"A2 \"G\"G2|\nw:my heart is low\n");
}

#[test]
fn test_roundtrip_decorations_and_symbols() {
    assert_roundtrip("X:1\nK:C\n.A ~B !trill!c uvHD|\n");
}

#[test]
fn test_roundtrip_macros_and_user_symbols() {
    assert_roundtrip("X:1\nm:n4 = A/B/\nU:T = !trill!\nK:C\nn4 TA|\n");
}

#[test]
fn test_roundtrip_voice_overlay_and_spacers() {
    assert_roundtrip("X:1\nK:C\nC2 E2 & G,4|y z2 x2|\n");
}

#[test]
fn test_roundtrip_preserves_errors() {
    // Even a document with recovery nodes reproduces its source.
    assert_roundtrip("X:1\nK:C\n[CEG|{ab DEF|^|\n");
}

#[test]
fn test_roundtrip_tuplets_graces_voltas() {
    assert_roundtrip("X:1\nK:C\n(3abc {/d}e|1 f2:|2 g2|]\n");
}

#[test]
fn test_roundtrip_continuation_and_comments() {
    assert_roundtrip("X:1\nK:C\nABC\\\n% half way\nDEF|\n");
}
