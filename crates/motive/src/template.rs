//! Pattern templates: the typed shape one voice should match.
//!
//! Wildcards are explicit variants, never missing values, so "don't
//! care" survives serialization and can be reasoned about downstream.

use notation::{Continuation, Note, NoteContent, Duration, Pitch};
use serde::{Deserialize, Serialize};

/// What a slot requires of the matched event's pitch content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchSpec {
    /// Don't care.
    Any,
    /// The event must be a rest.
    Rest,
    One(Pitch),
    /// Simultaneous pitches, each matched against its own fact node.
    Chord(Vec<Pitch>),
    /// Frequency-native reference in Hz, for corpora that store
    /// frequencies instead of spelled pitches.
    Frequency(f64),
}

/// What a slot requires of the matched event's duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationSpec {
    Any,
    Exact(Duration),
}

/// One templated note slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub pitch: PitchSpec,
    pub duration: DurationSpec,
    pub continuation: Continuation,
}

impl Slot {
    pub fn new(pitch: PitchSpec, duration: DurationSpec) -> Slot {
        Slot {
            pitch,
            duration,
            continuation: Continuation::Normal,
        }
    }

    /// The pitch used for interval computation in transposition mode.
    /// Chords contribute their first pitch; rests and wildcards none.
    pub(crate) fn anchor_pitch(&self) -> Option<&Pitch> {
        match &self.pitch {
            PitchSpec::One(p) => Some(p),
            PitchSpec::Chord(ps) => ps.first(),
            _ => None,
        }
    }
}

/// An ordered sequence of slots describing one voice's target shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternTemplate {
    pub slots: Vec<Slot>,
}

impl PatternTemplate {
    pub fn new(slots: Vec<Slot>) -> PatternTemplate {
        PatternTemplate { slots }
    }

    /// Build a fully concrete template from note events.
    pub fn from_notes(notes: &[Note]) -> PatternTemplate {
        let slots = notes
            .iter()
            .map(|note| {
                let pitch = match &note.content {
                    NoteContent::Single(p) => PitchSpec::One(*p),
                    NoteContent::Chord(ps) => PitchSpec::Chord(ps.clone()),
                    NoteContent::Rest => PitchSpec::Rest,
                };
                Slot {
                    pitch,
                    duration: DurationSpec::Exact(note.duration),
                    continuation: note.continuation,
                }
            })
            .collect();
        PatternTemplate { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notation::Pitch;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_notes_preserves_order_and_content() {
        let dur = Duration::from_denominator(8).unwrap();
        let notes = vec![
            Note::single(Pitch::parse("c/5").unwrap(), dur),
            Note::rest(dur),
        ];
        let template = PatternTemplate::from_notes(&notes);
        assert_eq!(template.len(), 2);
        assert_eq!(
            template.slots[0].pitch,
            PitchSpec::One(Pitch::parse("c/5").unwrap())
        );
        assert_eq!(template.slots[1].pitch, PitchSpec::Rest);
        assert_eq!(template.slots[1].duration, DurationSpec::Exact(dur));
    }

    #[test]
    fn anchor_pitch_takes_first_chord_member() {
        let c5 = Pitch::parse("c/5").unwrap();
        let e5 = Pitch::parse("e/5").unwrap();
        let slot = Slot::new(PitchSpec::Chord(vec![c5, e5]), DurationSpec::Any);
        assert_eq!(slot.anchor_pitch(), Some(&c5));

        let rest = Slot::new(PitchSpec::Rest, DurationSpec::Any);
        assert_eq!(rest.anchor_pitch(), None);
    }
}
