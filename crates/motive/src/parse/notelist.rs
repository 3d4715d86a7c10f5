//! Note-list syntax: a comma-separated list of `(pitch, value, role)`
//! triples, optionally wrapped in brackets.
//!
//! ```text
//! [(c#/5, 8, n), ([c/5 e/5 g/5], 4, n), (r, 8, n), (*, *, n)]
//! ```
//!
//! Pitch is a spelling, `r` for a rest, `*` for a wildcard, or a
//! space-separated chord in brackets. Value is the denominator of the
//! note value (8 = eighth), with trailing dots for dotted values, or
//! `*`. Role is `n` (normal), `r` (rest), `s` (tie start), `t` (tie
//! continue).

use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, repeat, separated};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use notation::{Continuation, Duration, Pitch};

use super::syntax_error;
use crate::error::{Error, Result};
use crate::template::{DurationSpec, PatternTemplate, PitchSpec, Slot};

type PResult<T> = winnow::ModalResult<T>;

#[derive(Debug)]
enum RawPitch {
    Wildcard,
    Rest,
    One(String),
    Chord(Vec<String>),
}

#[derive(Debug)]
enum RawValue {
    Wildcard,
    Noted { denominator: u32, dots: u32 },
}

#[derive(Debug)]
struct RawEntry {
    pitch: RawPitch,
    value: RawValue,
    role: char,
}

/// Parse note-list text into a pattern template.
pub fn parse_note_list(input: &str) -> Result<PatternTemplate> {
    let entries = note_list
        .parse(input)
        .map_err(|err| syntax_error(input, err.offset()))?;
    assemble(entries)
}

fn assemble(entries: Vec<RawEntry>) -> Result<PatternTemplate> {
    let mut slots = Vec::with_capacity(entries.len());
    for entry in entries {
        let pitch = match entry.pitch {
            RawPitch::Wildcard => PitchSpec::Any,
            RawPitch::Rest => PitchSpec::Rest,
            RawPitch::One(spelling) => PitchSpec::One(Pitch::parse(&spelling)?),
            RawPitch::Chord(spellings) => {
                let pitches = spellings
                    .iter()
                    .map(|s| Pitch::parse(s))
                    .collect::<notation::Result<Vec<_>>>()?;
                if pitches.len() < 2 {
                    return Err(Error::Validation(
                        "a chord needs at least two pitches".into(),
                    ));
                }
                PitchSpec::Chord(pitches)
            }
        };
        let duration = match entry.value {
            RawValue::Wildcard => DurationSpec::Any,
            RawValue::Noted { denominator, dots } => {
                DurationSpec::Exact(Duration::from_denominator(denominator)?.dotted(dots))
            }
        };
        // Role `r` marks a rest; the pitch field must agree.
        let pitch = match entry.role {
            'r' => match pitch {
                PitchSpec::Rest | PitchSpec::Any => PitchSpec::Rest,
                _ => {
                    return Err(Error::Validation(
                        "a rest role cannot carry a pitch".into(),
                    ))
                }
            },
            _ => pitch,
        };
        let continuation = match entry.role {
            'n' | 'r' => Continuation::Normal,
            's' => Continuation::TieStart,
            't' => Continuation::TieContinue,
            other => {
                return Err(Error::Validation(format!(
                    "unknown note role `{other}`, expected n, r, s or t"
                )))
            }
        };
        if matches!(pitch, PitchSpec::Rest) && continuation != Continuation::Normal {
            return Err(Error::Validation("a rest cannot carry a tie".into()));
        }
        slots.push(Slot {
            pitch,
            duration,
            continuation,
        });
    }
    Ok(PatternTemplate::new(slots))
}

fn note_list(input: &mut &str) -> PResult<Vec<RawEntry>> {
    delimited(
        multispace0,
        alt((
            delimited(
                ('[', multispace0),
                entries,
                (multispace0, ']'),
            ),
            entries,
        )),
        multispace0,
    )
    .parse_next(input)
}

fn entries(input: &mut &str) -> PResult<Vec<RawEntry>> {
    separated(1.., entry, (multispace0, ',', multispace0)).parse_next(input)
}

fn entry(input: &mut &str) -> PResult<RawEntry> {
    let (pitch, _, _, _, value, _, _, _, role) = delimited(
        ('(', multispace0),
        (
            raw_pitch,
            multispace0,
            ',',
            multispace0,
            raw_value,
            multispace0,
            ',',
            multispace0,
            one_of(('a'..='z', 'A'..='Z')),
        ),
        (multispace0, ')'),
    )
    .parse_next(input)?;
    Ok(RawEntry { pitch, value, role })
}

fn raw_pitch(input: &mut &str) -> PResult<RawPitch> {
    alt((
        '*'.map(|_| RawPitch::Wildcard),
        chord.map(RawPitch::Chord),
        spelling.map(|s: String| {
            if s == "r" {
                RawPitch::Rest
            } else {
                RawPitch::One(s)
            }
        }),
    ))
    .parse_next(input)
}

fn chord(input: &mut &str) -> PResult<Vec<String>> {
    delimited(
        ('[', multispace0),
        separated(1.., spelling, take_while(1.., ' ')),
        (multispace0, ']'),
    )
    .parse_next(input)
}

/// The raw characters of a pitch spelling; validated semantically later.
fn spelling(input: &mut &str) -> PResult<String> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '#' || c == '/' || c == '-'
    })
    .map(str::to_string)
    .parse_next(input)
}

fn raw_value(input: &mut &str) -> PResult<RawValue> {
    alt(('*'.map(|_| RawValue::Wildcard), noted_value)).parse_next(input)
}

fn noted_value(input: &mut &str) -> PResult<RawValue> {
    let digits: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let dots: Vec<char> = repeat(0.., '.').parse_next(input)?;
    let denominator = digits
        .parse()
        .map_err(|_| winnow::error::ErrMode::Cut(winnow::error::ContextError::new()))?;
    Ok(RawValue::Noted {
        denominator,
        dots: dots.len() as u32,
    })
}
