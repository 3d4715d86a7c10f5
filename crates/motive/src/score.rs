//! Fuzzy scoring of result rows.
//!
//! The emitted query over-approximates: its windows are alpha-cuts, so
//! everything the datastore returns is at least plausible. Scoring
//! measures each row's actual distance from the pattern references,
//! maps distances through the membership function, aggregates the
//! per-degree values, filters by alpha, and ranks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::polyphony::QueryPlan;
use crate::resolve::{IntervalBasis, PitchWindow};
use crate::tolerance::ToleranceSpec;
use crate::voice::CompiledVoice;

/// One datastore result row: projected alias to value.
pub type Row = serde_json::Map<String, Value>;

/// How per-degree memberships fold into one candidate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Fuzzy conjunction: the weakest degree decides.
    #[default]
    Min,
    /// Arithmetic mean, forgiving of a single poor slot.
    Mean,
}

/// One matched event, as observed in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedNote {
    /// Spelled pitches (`c#/5`), one per fact; empty for rests and
    /// wildcards.
    pub pitches: Vec<String>,
    pub frequency: Option<f64>,
    pub duration: Option<f64>,
    pub start: f64,
    pub end: f64,
}

/// One voice's matched span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceMatch {
    pub source: String,
    pub start: f64,
    pub end: f64,
    pub notes: Vec<ObservedNote>,
}

/// A scored candidate occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub score: f64,
    pub voices: Vec<VoiceMatch>,
}

impl MatchCandidate {
    fn earliest_start(&self) -> f64 {
        self.voices
            .iter()
            .map(|v| v.start)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Triangular membership: 1 at zero distance, linear to 0 at the
/// tolerance bound. A zero tolerance is crisp.
fn membership(distance: f64, tolerance: f64) -> f64 {
    if tolerance == 0.0 {
        if distance == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        (1.0 - distance / tolerance).clamp(0.0, 1.0)
    }
}

/// Score rows against the plan they were produced by, filter by the
/// plan's alpha, and rank by score then earliest onset.
pub fn score_rows(
    plan: &QueryPlan,
    spec: &ToleranceSpec,
    rows: &[Row],
    aggregation: Aggregation,
) -> Result<Vec<MatchCandidate>> {
    let mut candidates = Vec::new();
    for row in rows {
        let candidate = score_row(plan, spec, row, aggregation)?;
        if candidate.score >= spec.alpha {
            candidates.push(candidate);
        }
    }
    debug!(
        returned = rows.len(),
        accepted = candidates.len(),
        alpha = spec.alpha,
        "scored result rows"
    );

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.earliest_start().total_cmp(&b.earliest_start()))
    });
    Ok(candidates)
}

fn score_row(
    plan: &QueryPlan,
    spec: &ToleranceSpec,
    row: &Row,
    aggregation: Aggregation,
) -> Result<MatchCandidate> {
    let mut degrees = Vec::new();
    let mut voices = Vec::new();

    for voice in &plan.voices {
        voices.push(observe_voice(voice, row)?);
        score_voice(voice, spec, row, &mut degrees)?;
    }

    let score = match aggregation {
        Aggregation::Min => degrees.iter().copied().fold(1.0, f64::min),
        Aggregation::Mean => {
            if degrees.is_empty() {
                1.0
            } else {
                degrees.iter().sum::<f64>() / degrees.len() as f64
            }
        }
    };

    Ok(MatchCandidate { score, voices })
}

fn score_voice(
    voice: &CompiledVoice,
    spec: &ToleranceSpec,
    row: &Row,
    degrees: &mut Vec<f64>,
) -> Result<()> {
    let ns = &voice.namespace;

    for (i, window) in voice.windows.iter().enumerate() {
        match &window.pitch {
            PitchWindow::Any | PitchWindow::Rest => {}
            PitchWindow::Members(members) => {
                let observed = number(row, &format!("{ns}_semitones_{i}"))?;
                let reference = members.reference.semitones_from_a4() as f64;
                degrees.push(membership((observed - reference).abs(), spec.pitch));
            }
            PitchWindow::Chord(chord) => {
                for (j, members) in chord.iter().enumerate() {
                    let observed = number(row, &format!("{ns}_semitones_{i}_{j}"))?;
                    let reference = members.reference.semitones_from_a4() as f64;
                    degrees.push(membership((observed - reference).abs(), spec.pitch));
                }
            }
            PitchWindow::Frequency { reference_hz, .. } => {
                let observed = positive(row, &format!("{ns}_frequency_{i}"))?;
                let distance = 12.0 * (observed / reference_hz).log2();
                degrees.push(membership(distance.abs(), spec.pitch));
            }
            PitchWindow::Interval {
                reference, basis, ..
            } => {
                let observed = match basis {
                    IntervalBasis::Semitones => {
                        let current = number(row, &anchor_semitones_key(voice, i))?;
                        let previous = number(row, &anchor_semitones_key(voice, i - 1))?;
                        current - previous
                    }
                    IntervalBasis::Frequency => {
                        let current = positive(row, &format!("{ns}_frequency_{i}"))?;
                        let previous = positive(row, &format!("{ns}_frequency_{}", i - 1))?;
                        12.0 * (current / previous).log2()
                    }
                };
                degrees.push(membership((observed - reference).abs(), spec.pitch));
            }
        }

        if let Some(reference) = window.duration.reference {
            let observed = number(row, &format!("{ns}_duration_{i}"))?;
            degrees.push(membership((observed - reference).abs(), spec.duration));
        }

        if spec.gap > 0.0 && i + 1 < voice.len() {
            let end = number(row, &format!("{ns}_end_{i}"))?;
            let next_start = number(row, &format!("{ns}_start_{}", i + 1))?;
            let slack = (next_start - end).max(0.0);
            degrees.push(membership(slack, spec.gap));
        }
    }
    Ok(())
}

fn anchor_semitones_key(voice: &CompiledVoice, slot: usize) -> String {
    let ns = &voice.namespace;
    match voice.windows[slot].pitch {
        PitchWindow::Chord(_) => format!("{ns}_semitones_{slot}_0"),
        _ => format!("{ns}_semitones_{slot}"),
    }
}

fn observe_voice(voice: &CompiledVoice, row: &Row) -> Result<VoiceMatch> {
    let ns = &voice.namespace;
    let mut notes = Vec::with_capacity(voice.len());

    for (i, window) in voice.windows.iter().enumerate() {
        let mut pitches = Vec::new();
        match &window.pitch {
            PitchWindow::Chord(chord) => {
                for j in 0..chord.len() {
                    if let Some(p) = spelled(row, ns, &format!("{i}_{j}")) {
                        pitches.push(p);
                    }
                }
            }
            PitchWindow::Frequency { .. } => {}
            _ => {
                if let Some(p) = spelled(row, ns, &i.to_string()) {
                    pitches.push(p);
                }
            }
        }
        notes.push(ObservedNote {
            pitches,
            frequency: optional_number(row, &format!("{ns}_frequency_{i}")),
            duration: optional_number(row, &format!("{ns}_duration_{i}")),
            start: number(row, &format!("{ns}_start_{i}"))?,
            end: number(row, &format!("{ns}_end_{i}"))?,
        });
    }

    Ok(VoiceMatch {
        source: string(row, &format!("{ns}_source"))?,
        start: number(row, &format!("{ns}_start"))?,
        end: number(row, &format!("{ns}_end"))?,
        notes,
    })
}

fn spelled(row: &Row, ns: &str, suffix: &str) -> Option<String> {
    let class = row.get(&format!("{ns}_pitch_{suffix}"))?.as_str()?;
    let octave = row.get(&format!("{ns}_octave_{suffix}"))?.as_i64()?;
    Some(format!("{class}/{octave}"))
}

fn number(row: &Row, key: &str) -> Result<f64> {
    row.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::Execution(format!("result row is missing numeric column `{key}`")))
}

fn optional_number(row: &Row, key: &str) -> Option<f64> {
    row.get(key).and_then(Value::as_f64)
}

/// A numeric column that must also be strictly positive, as frequency
/// values feeding a log are.
fn positive(row: &Row, key: &str) -> Result<f64> {
    let value = number(row, key)?;
    if value <= 0.0 {
        return Err(Error::Execution(format!(
            "non-positive frequency {value} in column `{key}`"
        )));
    }
    Ok(value)
}

fn string(row: &Row, key: &str) -> Result<String> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::Execution(format!("result row is missing string column `{key}`")))
}
