//! Fuzzy tolerance parameters shared by every slot of a compiled query.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Widest accepted pitch tolerance, in semitones. Eight octaves spans
/// any playable register; wider values only blow up the enumerated
/// member windows.
pub const MAX_PITCH_TOLERANCE: f64 = 96.0;

/// Tolerances and acceptance threshold for one compilation request.
///
/// `pitch` is in semitones; `duration` and `gap` are in whole-note
/// units. `alpha` is the minimum aggregate membership a candidate needs
/// to be returned. There is no ambient default configuration: callers
/// pass a value through every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceSpec {
    pub pitch: f64,
    pub duration: f64,
    pub gap: f64,
    pub alpha: f64,
    pub allow_transposition: bool,
}

impl Default for ToleranceSpec {
    fn default() -> Self {
        ToleranceSpec {
            pitch: 0.0,
            duration: 0.0,
            gap: 0.0,
            alpha: 0.0,
            allow_transposition: false,
        }
    }
}

impl ToleranceSpec {
    /// Check ranges. Tolerances may be supplied separately from the
    /// pattern, so this runs at resolution time rather than parse time.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pitch tolerance", self.pitch),
            ("duration tolerance", self.duration),
            ("gap tolerance", self.gap),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Validation(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.pitch > MAX_PITCH_TOLERANCE {
            return Err(Error::Validation(format!(
                "pitch tolerance must be at most {MAX_PITCH_TOLERANCE} semitones, got {}",
                self.pitch
            )));
        }
        if !self.alpha.is_finite() || !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::Validation(format!(
                "alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }

    /// The alpha-cut of a tolerance: values farther than this from the
    /// reference would score below alpha no matter what, so emitted
    /// windows can be narrowed to this half-width.
    pub(crate) fn alpha_cut(&self, tolerance: f64) -> f64 {
        tolerance * (1.0 - self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_crisp() {
        let spec = ToleranceSpec::default();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.pitch, 0.0);
        assert!(!spec.allow_transposition);
    }

    #[test]
    fn negative_tolerance_rejected() {
        let spec = ToleranceSpec {
            duration: -0.1,
            ..Default::default()
        };
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn absurd_pitch_tolerance_rejected() {
        let spec = ToleranceSpec {
            pitch: MAX_PITCH_TOLERANCE + 1.0,
            ..Default::default()
        };
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));

        let at_bound = ToleranceSpec {
            pitch: MAX_PITCH_TOLERANCE,
            ..Default::default()
        };
        assert!(at_bound.validate().is_ok());
    }

    #[test]
    fn alpha_out_of_range_rejected() {
        let spec = ToleranceSpec {
            alpha: 1.5,
            ..Default::default()
        };
        assert!(spec.validate().is_err());

        let nan = ToleranceSpec {
            alpha: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn alpha_cut_narrows_windows() {
        let spec = ToleranceSpec {
            pitch: 2.0,
            alpha: 0.5,
            ..Default::default()
        };
        assert_eq!(spec.alpha_cut(spec.pitch), 1.0);
    }
}
