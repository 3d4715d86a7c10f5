//! Polyphony combination: merge compiled voices into one query plan.
//!
//! Voices are independent monophonic streams; alignment constraints tie
//! pairs of them together by bounding the offset between their first
//! onsets. Combination is commutative up to variable relabeling.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::voice::CompiledVoice;

/// Bounds the absolute onset offset between the first events of two
/// voices, in whole-note units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub first: usize,
    pub second: usize,
    pub max_onset_offset: f64,
}

/// A combined multi-voice plan ready for emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub voices: Vec<CompiledVoice>,
    pub alignments: Vec<Alignment>,
}

impl QueryPlan {
    pub fn is_polyphonic(&self) -> bool {
        self.voices.len() > 1
    }
}

/// Merge voices into a single plan, assigning each a positional
/// namespace `v0`, `v1`, ... so their query variables cannot collide.
pub fn combine(voices: Vec<CompiledVoice>, alignments: Vec<Alignment>) -> Result<QueryPlan> {
    if voices.is_empty() {
        return Err(Error::Structural("no voices to combine".into()));
    }

    for alignment in &alignments {
        if alignment.first >= voices.len() || alignment.second >= voices.len() {
            return Err(Error::Structural(format!(
                "alignment references voice {} but only {} voices exist",
                alignment.first.max(alignment.second),
                voices.len()
            )));
        }
        if alignment.first == alignment.second {
            return Err(Error::Structural(format!(
                "alignment ties voice {} to itself",
                alignment.first
            )));
        }
        if !alignment.max_onset_offset.is_finite() || alignment.max_onset_offset < 0.0 {
            return Err(Error::Validation(format!(
                "alignment offset must be a non-negative number, got {}",
                alignment.max_onset_offset
            )));
        }
    }

    let voices = voices
        .into_iter()
        .enumerate()
        .map(|(idx, mut voice)| {
            voice.namespace = format!("v{idx}");
            voice
        })
        .collect();

    Ok(QueryPlan { voices, alignments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FactSchema;
    use crate::template::{DurationSpec, PatternTemplate, PitchSpec, Slot};
    use crate::tolerance::ToleranceSpec;
    use crate::voice::compile_voice;
    use notation::{Duration, Pitch};
    use pretty_assertions::assert_eq;

    fn voice(pitches: &[&str]) -> CompiledVoice {
        let slots = pitches
            .iter()
            .map(|p| {
                Slot::new(
                    PitchSpec::One(Pitch::parse(p).unwrap()),
                    DurationSpec::Exact(Duration::from_denominator(4).unwrap()),
                )
            })
            .collect();
        compile_voice(
            &PatternTemplate::new(slots),
            &ToleranceSpec::default(),
            FactSchema::ClassOctave,
        )
        .unwrap()
    }

    #[test]
    fn assigns_positional_namespaces() {
        let plan = combine(vec![voice(&["c/5"]), voice(&["e/4"])], vec![]).unwrap();
        assert_eq!(plan.voices[0].namespace, "v0");
        assert_eq!(plan.voices[1].namespace, "v1");
        assert!(plan.is_polyphonic());
    }

    #[test]
    fn rejects_out_of_range_alignment() {
        let err = combine(
            vec![voice(&["c/5"])],
            vec![Alignment {
                first: 0,
                second: 1,
                max_onset_offset: 0.25,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn rejects_self_alignment() {
        let err = combine(
            vec![voice(&["c/5"]), voice(&["e/4"])],
            vec![Alignment {
                first: 1,
                second: 1,
                max_onset_offset: 0.0,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn rejects_negative_alignment_offset() {
        let err = combine(
            vec![voice(&["c/5"]), voice(&["e/4"])],
            vec![Alignment {
                first: 0,
                second: 1,
                max_onset_offset: -0.5,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rejects_empty_voice_list() {
        assert!(matches!(
            combine(vec![], vec![]),
            Err(Error::Structural(_))
        ));
    }
}
