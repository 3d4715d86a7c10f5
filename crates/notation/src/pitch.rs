//! Pitch spelling and twelve-tone arithmetic.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Reference frequency for A4 in Hz.
pub const A4_HZ: f64 = 440.0;

/// The seven natural note names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteClass {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteClass {
    /// Semitone offset from C (0-11).
    pub fn to_semitone(self) -> i32 {
        match self {
            NoteClass::C => 0,
            NoteClass::D => 2,
            NoteClass::E => 4,
            NoteClass::F => 5,
            NoteClass::G => 7,
            NoteClass::A => 9,
            NoteClass::B => 11,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteClass::C => "c",
            NoteClass::D => "d",
            NoteClass::E => "e",
            NoteClass::F => "f",
            NoteClass::G => "g",
            NoteClass::A => "a",
            NoteClass::B => "b",
        }
    }

    pub fn parse(c: char) -> Option<NoteClass> {
        match c.to_ascii_lowercase() {
            'c' => Some(NoteClass::C),
            'd' => Some(NoteClass::D),
            'e' => Some(NoteClass::E),
            'f' => Some(NoteClass::F),
            'g' => Some(NoteClass::G),
            'a' => Some(NoteClass::A),
            'b' => Some(NoteClass::B),
            _ => None,
        }
    }
}

/// Accidentals, including the double forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accidental {
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
    Natural,
}

impl Accidental {
    /// Signed semitone adjustment.
    pub fn semitone_offset(self) -> i32 {
        match self {
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::DoubleSharp => 2,
            Accidental::DoubleFlat => -2,
            Accidental::Natural => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
            Accidental::DoubleSharp => "x",
            Accidental::DoubleFlat => "bb",
            Accidental::Natural => "n",
        }
    }

    /// Parse the suffix of a spelling (`#`, `s`, `b`, `f`, `x`, `bb`, `n`).
    pub fn parse(s: &str) -> Option<Accidental> {
        match s {
            "#" | "s" => Some(Accidental::Sharp),
            "b" | "f" => Some(Accidental::Flat),
            "x" | "##" => Some(Accidental::DoubleSharp),
            "bb" => Some(Accidental::DoubleFlat),
            "n" => Some(Accidental::Natural),
            _ => None,
        }
    }
}

/// A spelled pitch: natural class, optional accidental, octave.
///
/// Class + accidental + octave uniquely determine the frequency.
/// Equality is spelling-sensitive; use [`Pitch::semitones_from_a4`]
/// to compare enharmonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub class: NoteClass,
    pub accidental: Option<Accidental>,
    pub octave: i8,
}

impl Pitch {
    pub fn new(class: NoteClass, accidental: Option<Accidental>, octave: i8) -> Self {
        Pitch {
            class,
            accidental,
            octave,
        }
    }

    /// Parse a spelling like `c#/5`, `db5`, `a/4`. The slash before the
    /// octave is optional; spellings are case-insensitive.
    pub fn parse(input: &str) -> Result<Pitch> {
        let s = input.trim().to_ascii_lowercase();

        let (head, octave_str) = match s.split_once('/') {
            Some((h, o)) => (h.to_string(), o.to_string()),
            None => {
                let boundary = s
                    .char_indices()
                    .find(|(i, c)| {
                        c.is_ascii_digit() || (*c == '-' && *i > 0)
                    })
                    .map(|(i, _)| i)
                    .ok_or_else(|| Error::BadOctave(input.to_string()))?;
                (s[..boundary].to_string(), s[boundary..].to_string())
            }
        };

        let mut chars = head.chars();
        let class = chars
            .next()
            .and_then(NoteClass::parse)
            .ok_or_else(|| Error::UnknownPitch(input.to_string()))?;

        let accid_str: String = chars.collect();
        let accidental = if accid_str.is_empty() {
            None
        } else {
            Some(
                Accidental::parse(&accid_str)
                    .ok_or_else(|| Error::UnknownPitch(input.to_string()))?,
            )
        };

        let octave: i8 = octave_str
            .parse()
            .map_err(|_| Error::BadOctave(input.to_string()))?;
        // Scientific pitch notation in use runs roughly C-1 to B10;
        // anything outside that is a typo, not a note.
        if !(-1..=12).contains(&octave) {
            return Err(Error::BadOctave(input.to_string()));
        }

        Ok(Pitch::new(class, accidental, octave))
    }

    /// Signed semitone distance from A4.
    pub fn semitones_from_a4(&self) -> i32 {
        let within = self.class.to_semitone()
            + self.accidental.map_or(0, Accidental::semitone_offset);
        (self.octave as i32 - 4) * 12 + within - 9
    }

    /// Frequency in Hz under equal temperament, A4 = 440 Hz.
    pub fn frequency(&self) -> f64 {
        A4_HZ * 2f64.powf(self.semitones_from_a4() as f64 / 12.0)
    }

    /// Rebuild a pitch from its semitone distance to A4, spelled with
    /// sharps.
    pub fn from_semitones_from_a4(semitones: i32) -> Pitch {
        let from_c4 = semitones + 9;
        let octave = 4 + from_c4.div_euclid(12);
        let (class, accidental) = class_from_chroma(from_c4.rem_euclid(12));
        Pitch::new(class, accidental, octave as i8)
    }

    /// This pitch shifted by `semitones`, sharp-spelled.
    pub fn transposed(&self, semitones: i32) -> Pitch {
        Pitch::from_semitones_from_a4(self.semitones_from_a4() + semitones)
    }

    /// Signed interval in semitones from `self` up to `other`.
    pub fn interval_to(&self, other: &Pitch) -> i32 {
        other.semitones_from_a4() - self.semitones_from_a4()
    }

    /// The class-plus-accidental part of the spelling, e.g. `c#`.
    pub fn class_accid(&self) -> String {
        match self.accidental {
            Some(a) => format!("{}{}", self.class.as_str(), a.as_str()),
            None => self.class.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Pitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.class_accid(), self.octave)
    }
}

/// Chromatic index (semitones above C, 0-11) to sharp spelling.
fn class_from_chroma(chroma: i32) -> (NoteClass, Option<Accidental>) {
    match chroma {
        0 => (NoteClass::C, None),
        1 => (NoteClass::C, Some(Accidental::Sharp)),
        2 => (NoteClass::D, None),
        3 => (NoteClass::D, Some(Accidental::Sharp)),
        4 => (NoteClass::E, None),
        5 => (NoteClass::F, None),
        6 => (NoteClass::F, Some(Accidental::Sharp)),
        7 => (NoteClass::G, None),
        8 => (NoteClass::G, Some(Accidental::Sharp)),
        9 => (NoteClass::A, None),
        10 => (NoteClass::A, Some(Accidental::Sharp)),
        11 => (NoteClass::B, None),
        _ => unreachable!(), // rem_euclid(12) is always 0-11
    }
}
