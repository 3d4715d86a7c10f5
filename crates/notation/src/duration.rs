//! Rational note values.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An exact note value as a fraction of a whole note.
///
/// `Duration::new(1, 4)` is a quarter note. Values stay rational so
/// dotted notes and tuplets never accumulate float error; convert with
/// [`Duration::to_whole_notes`] only at the window-arithmetic boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Duration {
    pub numerator: u32,
    pub denominator: u32,
}

impl Duration {
    pub fn new(numerator: u32, denominator: u32) -> Result<Duration> {
        if denominator == 0 {
            return Err(Error::BadDenominator(0));
        }
        Ok(Duration {
            numerator,
            denominator,
        }
        .reduced())
    }

    /// A `1/denominator` note value (8 = eighth note).
    pub fn from_denominator(denominator: u32) -> Result<Duration> {
        Duration::new(1, denominator)
    }

    /// Apply `dots` augmentation dots; each dot adds half the previous
    /// value, so one dot multiplies by 3/2, two by 7/4.
    pub fn dotted(self, dots: u32) -> Duration {
        if dots == 0 {
            return self;
        }
        let factor = 2u32.pow(dots);
        Duration {
            numerator: self.numerator * (2 * factor - 1),
            denominator: self.denominator * factor,
        }
        .reduced()
    }

    pub fn to_whole_notes(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Decompose into a base power-of-two denominator plus a dot count,
    /// when this value has that shape. `3/8` is a dotted quarter, so it
    /// yields `(4, 1)`; `5/8` has no dotted spelling and yields `None`.
    pub fn as_denominator_dots(self) -> Option<(u32, u32)> {
        // A value with `dots` dots has numerator 2^(dots+1) - 1.
        if !(self.numerator + 1).is_power_of_two() {
            return None;
        }
        let dots = (self.numerator + 1).trailing_zeros() - 1;
        let scale = 1u32 << dots;
        if self.denominator % scale != 0 {
            return None;
        }
        let base = self.denominator / scale;
        if !base.is_power_of_two() {
            return None;
        }
        Some((base, dots))
    }

    fn reduced(self) -> Duration {
        let g = gcd(self.numerator.max(1), self.denominator);
        Duration {
            numerator: self.numerator / g,
            denominator: self.denominator / g,
        }
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a.max(1)
}
