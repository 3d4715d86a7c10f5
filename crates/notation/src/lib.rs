//! Typed representation of symbolic music: pitches with spelling,
//! rational durations, and note/chord/rest events.
//!
//! These types carry the content of a melodic pattern independently of
//! any query surface. Pitch arithmetic is twelve-tone equal temperament
//! with A4 = 440 Hz; spellings normalize to sharps when transposed, the
//! same convention the corpora this crate targets are loaded with.

pub mod duration;
pub mod note;
pub mod pitch;

pub use duration::Duration;
pub use note::{Continuation, Note, NoteContent};
pub use pitch::{Accidental, NoteClass, Pitch};

/// Errors from constructing or parsing notation values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown pitch spelling `{0}`")]
    UnknownPitch(String),
    #[error("octave not readable in `{0}`")]
    BadOctave(String),
    #[error("invalid duration denominator {0}")]
    BadDenominator(u32),
    #[error("a chord needs at least two pitches, got {0}")]
    ChordTooSmall(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
