//! Tolerance resolution: from fuzzy scalars to concrete match windows.
//!
//! Each template slot resolves to a [`ToleranceWindow`] carrying both
//! the discrete constraint the emitter renders and the reference value
//! the scorer measures distances against. Windows are the alpha-cut of
//! the membership function: a value outside the narrowed window could
//! never reach the acceptance threshold.

use notation::pitch::A4_HZ;
use notation::Pitch;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::options::FactSchema;
use crate::template::{DurationSpec, PatternTemplate, PitchSpec, Slot};
use crate::tolerance::ToleranceSpec;

/// An enumerated absolute pitch window with its reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchMembers {
    pub reference: Pitch,
    /// Every class+octave pair within tolerance, sharp-spelled,
    /// reference included.
    pub members: Vec<Pitch>,
}

/// Resolved per-slot pitch constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchWindow {
    /// No pitch constraint (wildcard slot, or first/unanchored slot in
    /// transposition mode).
    Any,
    /// The event must be a rest.
    Rest,
    Members(PitchMembers),
    /// One member set per chord pitch, each bound to its own fact node.
    Chord(Vec<PitchMembers>),
    /// Closed frequency interval in Hz.
    Frequency {
        reference_hz: f64,
        low_hz: f64,
        high_hz: f64,
    },
    /// Signed semitone interval relative to the previous matched pitch.
    Interval {
        reference: f64,
        low: f64,
        high: f64,
        basis: IntervalBasis,
    },
}

/// Which fact field an interval predicate is measured on. Class/octave
/// corpora subtract `halfTonesFromA4` values directly; frequency
/// corpora recover semitones from the ratio of `frequency` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalBasis {
    Semitones,
    Frequency,
}

/// Resolved duration interval in whole-note units. A wildcard duration
/// has no reference and an unbounded interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationWindow {
    pub reference: Option<f64>,
    pub low: f64,
    pub high: f64,
}

impl DurationWindow {
    pub fn unconstrained() -> DurationWindow {
        DurationWindow {
            reference: None,
            low: 0.0,
            high: f64::INFINITY,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.low == self.high
    }
}

/// The full resolved constraint for one slot. `gap` bounds the slack
/// between this slot's event and the next one's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceWindow {
    pub pitch: PitchWindow,
    pub duration: DurationWindow,
    pub gap: f64,
}

/// Resolve every slot of a template. Fails with a validation error on
/// negative tolerances or out-of-range alpha; tolerances may arrive
/// separately from the pattern, so this is the first place they can be
/// checked.
pub fn resolve_windows(
    template: &PatternTemplate,
    spec: &ToleranceSpec,
    schema: FactSchema,
) -> Result<Vec<ToleranceWindow>> {
    spec.validate()?;

    let mut windows = Vec::with_capacity(template.len());
    for (idx, slot) in template.slots.iter().enumerate() {
        let prev = if idx > 0 {
            Some(&template.slots[idx - 1])
        } else {
            None
        };
        windows.push(resolve_slot(slot, prev, spec, schema)?);
    }
    Ok(windows)
}

fn resolve_slot(
    slot: &Slot,
    prev: Option<&Slot>,
    spec: &ToleranceSpec,
    schema: FactSchema,
) -> Result<ToleranceWindow> {
    let pitch = resolve_pitch(slot, prev, spec, schema)?;
    let duration = resolve_duration(&slot.duration, spec);
    Ok(ToleranceWindow {
        pitch,
        duration,
        gap: spec.alpha_cut(spec.gap),
    })
}

fn resolve_pitch(
    slot: &Slot,
    prev: Option<&Slot>,
    spec: &ToleranceSpec,
    schema: FactSchema,
) -> Result<PitchWindow> {
    if let PitchSpec::Chord(pitches) = &slot.pitch {
        if pitches.len() < 2 {
            return Err(Error::Validation(format!(
                "a chord needs at least two pitches, got {}",
                pitches.len()
            )));
        }
    }
    if let PitchSpec::Frequency(hz) = slot.pitch {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(Error::Validation(format!(
                "frequency reference must be positive, got {hz}"
            )));
        }
    }

    match &slot.pitch {
        PitchSpec::Any => Ok(PitchWindow::Any),
        PitchSpec::Rest => Ok(PitchWindow::Rest),
        // Transposition makes every pitch reference relative to the
        // previous anchored slot, frequency references included; first
        // slots and slots after rests/wildcards are free.
        _ if spec.allow_transposition => {
            match (prev.and_then(anchor_semitones), anchor_semitones(slot)) {
                (Some(p), Some(c)) => {
                    let reference = c - p;
                    let cut = spec.alpha_cut(spec.pitch);
                    Ok(PitchWindow::Interval {
                        reference,
                        low: reference - cut,
                        high: reference + cut,
                        basis: interval_basis(schema),
                    })
                }
                _ => Ok(PitchWindow::Any),
            }
        }
        PitchSpec::Frequency(hz) => Ok(frequency_window(*hz, spec)),
        PitchSpec::One(pitch) => Ok(match schema {
            FactSchema::ClassOctave => PitchWindow::Members(absolute_members(pitch, spec)),
            FactSchema::Frequency => frequency_window(pitch.frequency(), spec),
        }),
        PitchSpec::Chord(pitches) => Ok(match schema {
            FactSchema::ClassOctave => {
                PitchWindow::Chord(pitches.iter().map(|p| absolute_members(p, spec)).collect())
            }
            FactSchema::Frequency => {
                // Frequency corpora store one value per fact; anchor
                // the chord on its first pitch.
                frequency_window(pitches[0].frequency(), spec)
            }
        }),
    }
}

/// A slot's pitch height in semitones from A4: exact for spelled
/// pitches, fractional for raw frequency references.
fn anchor_semitones(slot: &Slot) -> Option<f64> {
    match &slot.pitch {
        PitchSpec::Frequency(hz) => Some(12.0 * (hz / A4_HZ).log2()),
        _ => slot.anchor_pitch().map(|p| p.semitones_from_a4() as f64),
    }
}

/// Which fact field interval predicates compare on this schema.
fn interval_basis(schema: FactSchema) -> IntervalBasis {
    match schema {
        FactSchema::ClassOctave => IntervalBasis::Semitones,
        FactSchema::Frequency => IntervalBasis::Frequency,
    }
}

/// Enumerate every class+octave pair within the alpha-cut tolerance of
/// the reference. The reference itself is always a member, and widening
/// the tolerance only ever adds members.
fn absolute_members(reference: &Pitch, spec: &ToleranceSpec) -> PitchMembers {
    let max_semitones = spec.alpha_cut(spec.pitch).floor() as i32;
    let members = (-max_semitones..=max_semitones)
        .map(|offset| reference.transposed(offset))
        .collect();
    PitchMembers {
        reference: *reference,
        members,
    }
}

fn frequency_window(reference_hz: f64, spec: &ToleranceSpec) -> PitchWindow {
    let cut = spec.alpha_cut(spec.pitch);
    PitchWindow::Frequency {
        reference_hz,
        low_hz: reference_hz * 2f64.powf(-cut / 12.0),
        high_hz: reference_hz * 2f64.powf(cut / 12.0),
    }
}

fn resolve_duration(duration: &DurationSpec, spec: &ToleranceSpec) -> DurationWindow {
    match duration {
        DurationSpec::Any => DurationWindow::unconstrained(),
        DurationSpec::Exact(d) => {
            let reference = d.to_whole_notes();
            let cut = spec.alpha_cut(spec.duration);
            DurationWindow {
                reference: Some(reference),
                low: (reference - cut).max(0.0),
                high: reference + cut,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notation::Duration;
    use pretty_assertions::assert_eq;

    fn slot(p: &str, denom: u32) -> Slot {
        Slot::new(
            PitchSpec::One(Pitch::parse(p).unwrap()),
            DurationSpec::Exact(Duration::from_denominator(denom).unwrap()),
        )
    }

    fn spec(pitch: f64, duration: f64, gap: f64) -> ToleranceSpec {
        ToleranceSpec {
            pitch,
            duration,
            gap,
            ..Default::default()
        }
    }

    fn members_of(window: &PitchWindow) -> &PitchMembers {
        match window {
            PitchWindow::Members(m) => m,
            other => panic!("expected member window, got {other:?}"),
        }
    }

    #[test]
    fn zero_tolerance_window_is_just_the_reference() {
        let template = PatternTemplate::new(vec![slot("c/5", 8)]);
        let windows =
            resolve_windows(&template, &spec(0.0, 0.0, 0.0), FactSchema::ClassOctave).unwrap();
        let m = members_of(&windows[0].pitch);
        assert_eq!(m.members, vec![Pitch::parse("c/5").unwrap()]);
        assert!(windows[0].duration.is_exact());
        assert_eq!(windows[0].duration.reference, Some(0.125));
        assert_eq!(windows[0].gap, 0.0);
    }

    #[test]
    fn reference_always_inside_its_own_window() {
        for tolerance in [0.0, 0.5, 1.0, 3.0, 7.2] {
            let template = PatternTemplate::new(vec![slot("f#/4", 4)]);
            let windows =
                resolve_windows(&template, &spec(tolerance, 0.0, 0.0), FactSchema::ClassOctave)
                    .unwrap();
            let m = members_of(&windows[0].pitch);
            // The reference is sharp-spelled already, so member equality holds
            assert!(m.members.contains(&m.reference));
        }
    }

    #[test]
    fn widening_tolerance_never_removes_members() {
        let template = PatternTemplate::new(vec![slot("a/4", 4)]);
        let mut previous: Vec<Pitch> = Vec::new();
        for tolerance in [0.0, 1.0, 2.0, 5.0, 12.0] {
            let windows =
                resolve_windows(&template, &spec(tolerance, 0.0, 0.0), FactSchema::ClassOctave)
                    .unwrap();
            let m = members_of(&windows[0].pitch);
            for p in &previous {
                assert!(m.members.contains(p), "lost {p} at tolerance {tolerance}");
            }
            previous = m.members.clone();
        }
    }

    #[test]
    fn duration_window_clamps_at_zero() {
        let template = PatternTemplate::new(vec![slot("c/5", 16)]);
        let windows =
            resolve_windows(&template, &spec(0.0, 0.25, 0.0), FactSchema::ClassOctave).unwrap();
        let d = windows[0].duration;
        assert_eq!(d.low, 0.0);
        assert_eq!(d.high, 0.0625 + 0.25);
        assert_eq!(d.reference, Some(0.0625));
    }

    #[test]
    fn frequency_schema_emits_symmetric_ratio_bounds() {
        let template = PatternTemplate::new(vec![slot("a/4", 4)]);
        let windows =
            resolve_windows(&template, &spec(12.0, 0.0, 0.0), FactSchema::Frequency).unwrap();
        match windows[0].pitch {
            PitchWindow::Frequency {
                reference_hz,
                low_hz,
                high_hz,
            } => {
                assert!((reference_hz - 440.0).abs() < 1e-9);
                assert!((low_hz - 220.0).abs() < 1e-6);
                assert!((high_hz - 880.0).abs() < 1e-6);
            }
            ref other => panic!("expected frequency window, got {other:?}"),
        }
    }

    #[test]
    fn transposition_mode_resolves_relative_intervals() {
        let template = PatternTemplate::new(vec![slot("c/5", 8), slot("d/5", 8), slot("e/5", 8)]);
        let spec = ToleranceSpec {
            pitch: 1.0,
            allow_transposition: true,
            ..Default::default()
        };
        let windows = resolve_windows(&template, &spec, FactSchema::ClassOctave).unwrap();

        assert_eq!(windows[0].pitch, PitchWindow::Any);
        match windows[1].pitch {
            PitchWindow::Interval {
                reference,
                low,
                high,
                basis,
            } => {
                assert_eq!(reference, 2.0);
                assert_eq!(low, 1.0);
                assert_eq!(high, 3.0);
                assert_eq!(basis, IntervalBasis::Semitones);
            }
            ref other => panic!("expected interval window, got {other:?}"),
        }
        assert!(matches!(windows[2].pitch, PitchWindow::Interval { .. }));
    }

    #[test]
    fn frequency_schema_intervals_compare_frequency_ratios() {
        let template = PatternTemplate::new(vec![slot("c/5", 8), slot("d/5", 8)]);
        let spec = ToleranceSpec {
            pitch: 1.0,
            allow_transposition: true,
            ..Default::default()
        };
        let windows = resolve_windows(&template, &spec, FactSchema::Frequency).unwrap();
        assert_eq!(windows[0].pitch, PitchWindow::Any);
        match windows[1].pitch {
            PitchWindow::Interval {
                reference, basis, ..
            } => {
                assert_eq!(reference, 2.0);
                assert_eq!(basis, IntervalBasis::Frequency);
            }
            ref other => panic!("expected interval window, got {other:?}"),
        }
    }

    #[test]
    fn frequency_references_transpose_relatively() {
        // An octave leap written in Hz must resolve to a 12-semitone
        // interval, not to absolute frequency windows.
        let template = PatternTemplate::new(vec![
            Slot::new(PitchSpec::Frequency(440.0), DurationSpec::Any),
            Slot::new(PitchSpec::Frequency(880.0), DurationSpec::Any),
        ]);
        let spec = ToleranceSpec {
            pitch: 0.5,
            allow_transposition: true,
            ..Default::default()
        };
        let windows = resolve_windows(&template, &spec, FactSchema::ClassOctave).unwrap();
        assert_eq!(windows[0].pitch, PitchWindow::Any);
        match windows[1].pitch {
            PitchWindow::Interval {
                reference,
                low,
                high,
                basis,
            } => {
                assert!((reference - 12.0).abs() < 1e-9);
                assert!((low - 11.5).abs() < 1e-9);
                assert!((high - 12.5).abs() < 1e-9);
                assert_eq!(basis, IntervalBasis::Semitones);
            }
            ref other => panic!("expected interval window, got {other:?}"),
        }
    }

    #[test]
    fn spelled_and_frequency_anchors_chain_together() {
        let template = PatternTemplate::new(vec![
            slot("a/4", 8),
            Slot::new(PitchSpec::Frequency(880.0), DurationSpec::Any),
        ]);
        let spec = ToleranceSpec {
            allow_transposition: true,
            ..Default::default()
        };
        let windows = resolve_windows(&template, &spec, FactSchema::ClassOctave).unwrap();
        match windows[1].pitch {
            PitchWindow::Interval { reference, .. } => {
                assert!((reference - 12.0).abs() < 1e-9);
            }
            ref other => panic!("expected interval window, got {other:?}"),
        }
    }

    #[test]
    fn rest_breaks_the_interval_chain() {
        let template = PatternTemplate::new(vec![
            slot("c/5", 8),
            Slot::new(PitchSpec::Rest, DurationSpec::Any),
            slot("e/5", 8),
        ]);
        let spec = ToleranceSpec {
            allow_transposition: true,
            ..Default::default()
        };
        let windows = resolve_windows(&template, &spec, FactSchema::ClassOctave).unwrap();
        assert_eq!(windows[1].pitch, PitchWindow::Rest);
        assert_eq!(windows[2].pitch, PitchWindow::Any);
    }

    #[test]
    fn negative_tolerance_fails_at_resolution() {
        let template = PatternTemplate::new(vec![slot("c/5", 8)]);
        let bad = ToleranceSpec {
            gap: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            resolve_windows(&template, &bad, FactSchema::ClassOctave),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn alpha_cut_narrows_the_member_set() {
        let template = PatternTemplate::new(vec![slot("a/4", 4)]);
        let wide =
            resolve_windows(&template, &spec(2.0, 0.0, 0.0), FactSchema::ClassOctave).unwrap();
        let narrow_spec = ToleranceSpec {
            pitch: 2.0,
            alpha: 0.75,
            ..Default::default()
        };
        let narrow = resolve_windows(&template, &narrow_spec, FactSchema::ClassOctave).unwrap();
        let wide_len = members_of(&wide[0].pitch).members.len();
        let narrow_len = members_of(&narrow[0].pitch).members.len();
        assert!(narrow_len < wide_len);
        // The reference survives any alpha
        assert!(members_of(&narrow[0].pitch)
            .members
            .contains(&Pitch::parse("a/4").unwrap()));
    }
}
