//! Duration maps and bar partitioning for multi-voice alignment
//!
//! The duration engine walks a bar's events with a running state machine:
//! an open tuplet scales each note by q/p and counts down, a broken
//! rhythm marker multiplies its own note and leaves the complementary
//! multiplier pending for the next one, a beam contributes the sum of
//! its members, a chord contributes its chord-level rhythm only, and a
//! multi-measure rest is infinite and ends accumulation for the bar.

use serde::{Deserialize, Serialize};

use crate::models::ast::{Node, Rhythm};
use crate::rational::Rational;

/// One event in a bar's time map
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimedEvent {
    /// Offset from the start of the bar, in unit note lengths
    pub offset: Rational,
    pub node_id: u32,
}

/// Time map of a single bar
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BarTimeMap {
    pub events: Vec<TimedEvent>,
    /// Total bar duration in unit note lengths; infinite after a
    /// multi-measure rest
    pub total: Rational,
}

/// A bar slice of a system: its events plus the closing bar line, if any
pub struct Bar<'a> {
    pub elements: Vec<&'a Node>,
    pub barline: Option<&'a Node>,
}

/// Partition a system's elements into bars at bar-line boundaries.
/// Leading info/inline fields, whitespace and the trailing newline stay
/// out of every bar.
pub fn split_bars<'a>(elements: &'a [Node]) -> Vec<Bar<'a>> {
    let mut bars = Vec::new();
    let mut current: Vec<&'a Node> = Vec::new();
    for node in elements {
        match node {
            Node::Barline { .. } => {
                bars.push(Bar {
                    elements: std::mem::take(&mut current),
                    barline: Some(node),
                });
            }
            Node::Newline { .. } => break,
            _ => current.push(node),
        }
    }
    if !current.is_empty() {
        bars.push(Bar {
            elements: current,
            barline: None,
        });
    }
    bars
}

/// Duration walk state, carried across the events of one bar
#[derive(Default)]
struct DurationState {
    /// Open tuplet: (q/p scale, notes remaining)
    tuplet: Option<(Rational, u32)>,
    /// Multiplier owed to the next note by a broken rhythm marker
    pending_broken: Option<Rational>,
}

impl DurationState {
    /// Scale a note-level duration through the open tuplet, counting it
    /// down and closing the tuplet at zero
    fn scale(&mut self, duration: Rational) -> Rational {
        match &mut self.tuplet {
            Some((ratio, remaining)) => {
                let scaled = duration.multiply(ratio);
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    self.tuplet = None;
                }
                scaled
            }
            None => duration,
        }
    }
}

/// Build the time map of one bar.
pub fn bar_time_map(bar: &Bar) -> BarTimeMap {
    let mut map = BarTimeMap::default();
    let mut state = DurationState::default();
    let mut offset = Rational::zero();

    for node in &bar.elements {
        let duration = element_duration(node, &mut state);
        if node.is_note_like() || matches!(node, Node::MultiMeasureRest { .. }) {
            map.events.push(TimedEvent {
                offset,
                node_id: node.id(),
            });
        }
        if duration.is_infinite() {
            // Multi-measure rest: the bar is full, stop accumulating.
            offset = duration;
            break;
        }
        offset = offset.add(&duration);
    }

    map.total = offset;
    map
}

/// Duration of one element in unit note lengths, threading tuplet and
/// broken-rhythm state
fn element_duration(node: &Node, state: &mut DurationState) -> Rational {
    match node {
        Node::Note { rhythm, .. } => note_event_duration(rhythm.as_ref(), state),
        Node::Rest { rhythm, .. } => note_event_duration(rhythm.as_ref(), state),
        // Chord-level rhythm wins; rhythms on the notes inside are ignored.
        Node::Chord { rhythm, .. } => note_event_duration(rhythm.as_ref(), state),
        Node::MultiMeasureRest { .. } => Rational::new(1, 0),
        Node::Beam { elements, .. } => elements
            .iter()
            .fold(Rational::zero(), |acc, el| {
                acc.add(&element_duration(el, state))
            }),
        Node::Tuplet { p, q, r, .. } => {
            let q = q.unwrap_or_else(|| default_tuplet_q(*p));
            let remaining = r.unwrap_or(*p);
            state.tuplet = Some((Rational::new(q as i64, *p as i64), remaining));
            Rational::zero()
        }
        // Grace notes are stolen time.
        Node::GraceGroup { .. } => Rational::zero(),
        _ => Rational::zero(),
    }
}

fn note_event_duration(rhythm: Option<&Rhythm>, state: &mut DurationState) -> Rational {
    let mut duration = note_duration(rhythm);
    if let Some(pending) = state.pending_broken.take() {
        duration = duration.multiply(&pending);
    }
    if let Some(broken) = rhythm.and_then(|r| r.broken.as_ref()) {
        let (own, next) = if broken.lexeme.starts_with('>') {
            (Rational::new(3, 2), Rational::new(1, 2))
        } else {
            (Rational::new(1, 2), Rational::new(3, 2))
        };
        duration = duration.multiply(&own);
        state.pending_broken = Some(next);
    }
    state.scale(duration)
}

/// Plain rhythm value of a note, in unit note lengths: numerator over
/// either the explicit denominator or 2^(slash count)
pub fn note_duration(rhythm: Option<&Rhythm>) -> Rational {
    let rhythm = match rhythm {
        Some(r) => r,
        None => return Rational::one(),
    };
    let numerator = rhythm
        .numerator
        .as_ref()
        .and_then(|t| t.lexeme.parse::<i64>().ok())
        .unwrap_or(1);
    let denominator = match (&rhythm.slashes, &rhythm.denominator) {
        (Some(_), Some(t)) => t.lexeme.parse::<i64>().unwrap_or(2),
        (Some(slashes), None) => 1i64 << slashes.lexeme.chars().count().min(62),
        (None, _) => 1,
    };
    Rational::new(numerator, denominator)
}

/// Default q when a tuplet leaves it unspecified: duplets and their
/// doublings fit into three, triplets and sextuplets into two, anything
/// else into two.
fn default_tuplet_q(p: u32) -> u32 {
    match p {
        2 | 4 | 8 => 3,
        3 | 6 => 2,
        _ => 2,
    }
}
