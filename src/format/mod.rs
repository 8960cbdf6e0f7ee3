//! Formatting: lossless stringify and canonical multi-voice alignment
//!
//! `format` re-serializes the document, right-padding bars in groups of
//! parallel voice lines so that bar lines at the same bar index land in
//! the same output column. A voice line either opens with an inline
//! `[V:..]` field or follows a standalone `V:` info line; both forms
//! join the same alignment group.

pub mod align;
pub mod stringify;

pub use align::{bar_time_map, note_duration, split_bars, BarTimeMap, TimedEvent};
pub use stringify::{stringify, stringify_node};

use crate::models::ast::{FileStructure, Node, System};

/// Canonical re-serialization with multi-voice bar alignment.
pub fn format(file: &FileStructure) -> String {
    let mut out = String::new();
    for node in &file.header {
        out.push_str(&stringify_node(node));
    }
    for tune in &file.tunes {
        for node in &tune.header {
            out.push_str(&stringify_node(node));
        }
        format_body(&tune.body, &mut out);
        for node in &tune.trailer {
            out.push_str(&stringify_node(node));
        }
    }
    out
}

fn format_body(body: &[System], out: &mut String) {
    let mut index = 0;
    while index < body.len() {
        let (entries, used) = collect_group(&body[index..]);
        if entries.len() >= 2 {
            format_aligned_group(&entries, out);
            index += used;
        } else {
            for node in &body[index].elements {
                out.push_str(&stringify_node(node));
            }
            index += 1;
        }
    }
}

/// One voice's slice of an alignment group: an optional standalone `V:`
/// declaration line plus the music line itself
struct VoiceEntry<'a> {
    decl: Option<&'a System>,
    system: &'a System,
    music_start: usize,
    voice: String,
}

/// Collect the parallel-voice run at the head of the slice: consecutive
/// voice entries with no voice repeating. Returns the entries plus how
/// many systems they consumed.
fn collect_group(systems: &[System]) -> (Vec<VoiceEntry<'_>>, usize) {
    let mut entries = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    let mut index = 0;
    while let Some((entry, used)) = next_voice_entry(&systems[index..]) {
        if seen.contains(&entry.voice) {
            break;
        }
        seen.push(entry.voice.clone());
        entries.push(entry);
        index += used;
    }
    (entries, index)
}

/// The voice entry starting at the first system, if there is one: either
/// a system opening with an inline `[V:..]` field, or a standalone `V:`
/// info line whose music sits on the following system.
fn next_voice_entry(systems: &[System]) -> Option<(VoiceEntry<'_>, usize)> {
    let first = systems.first()?;
    let voice = first.leading_voice()?;
    if let Some(end) = inline_prefix_end(first) {
        let entry = VoiceEntry {
            decl: None,
            system: first,
            music_start: end,
            voice,
        };
        return Some((entry, 1));
    }
    let music = systems.get(1)?;
    if music.leading_voice().is_some() || !has_music(music) {
        return None;
    }
    let entry = VoiceEntry {
        decl: Some(first),
        system: music,
        music_start: 0,
        voice,
    };
    Some((entry, 2))
}

/// Index just past the leading `[V:..]` field, when the system starts
/// with one
fn inline_prefix_end(system: &System) -> Option<usize> {
    for (i, node) in system.elements.iter().enumerate() {
        match node {
            Node::Whitespace { .. } => continue,
            Node::InlineField { key, .. } if key.lexeme.starts_with('V') => return Some(i + 1),
            _ => return None,
        }
    }
    None
}

fn has_music(system: &System) -> bool {
    system
        .elements
        .iter()
        .any(|n| n.is_note_like() || matches!(n, Node::Barline { .. }))
}

/// One voice line of an alignment group, pre-split into rendered bars
struct VoiceLine {
    decl: String,
    prefix: String,
    bars: Vec<RenderedBar>,
    newline: String,
}

struct RenderedBar {
    text: String,
    barline: String,
}

fn format_aligned_group(entries: &[VoiceEntry], out: &mut String) {
    let lines: Vec<VoiceLine> = entries.iter().map(render_voice_line).collect();

    let prefix_width = lines
        .iter()
        .map(|l| l.prefix.chars().count())
        .max()
        .unwrap_or(0);
    let bar_count = lines.iter().map(|l| l.bars.len()).max().unwrap_or(0);

    // Each bar column pads to the widest bar at that index, so bar lines
    // at the same index share an output column across the group.
    let mut widths = Vec::with_capacity(bar_count);
    for i in 0..bar_count {
        let width = lines
            .iter()
            .filter_map(|l| l.bars.get(i))
            .map(|b| b.text.chars().count())
            .max()
            .unwrap_or(0);
        widths.push(width);
    }

    for line in &lines {
        out.push_str(&line.decl);
        out.push_str(&line.prefix);
        for _ in line.prefix.chars().count()..prefix_width {
            out.push(' ');
        }
        if prefix_width > 0 {
            out.push(' ');
        }
        for (i, bar) in line.bars.iter().enumerate() {
            out.push_str(&bar.text);
            let width = widths.get(i).copied().unwrap_or(0);
            for _ in bar.text.chars().count()..width {
                out.push(' ');
            }
            out.push_str(&bar.barline);
        }
        out.push_str(&line.newline);
    }
}

fn render_voice_line(entry: &VoiceEntry) -> VoiceLine {
    let system = entry.system;
    let decl: String = entry
        .decl
        .map(|s| s.elements.iter().map(stringify_node).collect())
        .unwrap_or_default();
    let prefix: String = system.elements[..entry.music_start]
        .iter()
        .map(stringify_node)
        .collect::<String>()
        .trim()
        .to_string();

    let newline = system
        .elements
        .iter()
        .rev()
        .find_map(|n| match n {
            Node::Newline { token, .. } => Some(token.lexeme.clone()),
            _ => None,
        })
        .unwrap_or_default();

    let mut bars = Vec::new();
    for bar in split_bars(&system.elements[entry.music_start..]) {
        let text: String = bar
            .elements
            .iter()
            .map(|n| stringify_node(n))
            .collect::<String>()
            .trim()
            .to_string();
        let barline = bar.barline.map(stringify_node).unwrap_or_default();
        bars.push(RenderedBar { text, barline });
    }
    // Drop an empty trailing segment left by a line ending in a bar line.
    if let Some(last) = bars.last() {
        if last.text.is_empty() && last.barline.is_empty() {
            bars.pop();
        }
    }

    VoiceLine {
        decl,
        prefix,
        bars,
        newline,
    }
}
