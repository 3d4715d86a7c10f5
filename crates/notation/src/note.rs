//! Note events: single pitches, chords, and rests.

use serde::{Deserialize, Serialize};

use crate::{Duration, Error, Pitch, Result};

/// How a note relates to its neighbors across a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Continuation {
    Normal,
    TieStart,
    TieContinue,
}

/// The sounding content of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteContent {
    Single(Pitch),
    /// Simultaneous pitches, at least two.
    Chord(Vec<Pitch>),
    Rest,
}

/// One note event: content plus duration plus tie continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub content: NoteContent,
    pub duration: Duration,
    pub continuation: Continuation,
}

impl Note {
    pub fn single(pitch: Pitch, duration: Duration) -> Note {
        Note {
            content: NoteContent::Single(pitch),
            duration,
            continuation: Continuation::Normal,
        }
    }

    pub fn chord(pitches: Vec<Pitch>, duration: Duration) -> Result<Note> {
        if pitches.len() < 2 {
            return Err(Error::ChordTooSmall(pitches.len()));
        }
        Ok(Note {
            content: NoteContent::Chord(pitches),
            duration,
            continuation: Continuation::Normal,
        })
    }

    pub fn rest(duration: Duration) -> Note {
        Note {
            content: NoteContent::Rest,
            duration,
            continuation: Continuation::Normal,
        }
    }

    pub fn with_continuation(mut self, continuation: Continuation) -> Note {
        self.continuation = continuation;
        self
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.content, NoteContent::Rest)
    }
}
