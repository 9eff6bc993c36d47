//! Two-threshold latches that keep boolean form flags from flickering.

use serde::{Deserialize, Serialize};

/// A flag that turns true once the feature drops to `good` and false once it
/// climbs to `bad`; between the two it keeps its previous value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HysteresisBand {
    pub good: f64,
    pub bad: f64,
    /// Whether landing exactly on a threshold switches the flag
    pub inclusive: bool,
}

impl HysteresisBand {
    pub const fn strict(good: f64, bad: f64) -> Self {
        Self {
            good,
            bad,
            inclusive: false,
        }
    }

    pub const fn inclusive(good: f64, bad: f64) -> Self {
        Self {
            good,
            bad,
            inclusive: true,
        }
    }

    /// Next flag value. A missing feature keeps `previous`.
    pub fn apply(&self, previous: bool, feature: Option<f64>) -> bool {
        let Some(value) = feature.filter(|v| v.is_finite()) else {
            return previous;
        };
        let (turns_good, turns_bad) = if self.inclusive {
            (value <= self.good, value >= self.bad)
        } else {
            (value < self.good, value > self.bad)
        };

        if turns_good {
            true
        } else if turns_bad {
            false
        } else {
            previous
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_holds_inside_band() {
        let band = HysteresisBand::strict(30.0, 35.0);
        let mut flag = true;
        let mut seen = Vec::new();
        for tilt in [20.0, 32.0, 20.0] {
            flag = band.apply(flag, Some(tilt));
            seen.push(flag);
        }
        assert_eq!(seen, vec![true, true, true]);
    }

    #[test]
    fn test_flag_needs_full_recovery() {
        let band = HysteresisBand::strict(30.0, 35.0);
        let mut flag = true;
        let mut seen = Vec::new();
        for tilt in [36.0, 32.0, 31.0, 29.0] {
            flag = band.apply(flag, Some(tilt));
            seen.push(flag);
        }
        assert_eq!(seen, vec![false, false, false, true]);
    }

    #[test]
    fn test_inclusive_edges_and_missing_feature() {
        let band = HysteresisBand::inclusive(0.30, 0.40);
        assert!(band.apply(false, Some(0.30)));
        assert!(!band.apply(true, Some(0.40)));
        assert!(band.apply(true, None));
        assert!(!band.apply(false, Some(f64::NAN)));
    }
}
