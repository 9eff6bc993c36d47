//! Confidence gating: decides whether a landmark is trustworthy enough to use.

use serde::{Deserialize, Serialize};

use crate::types::{Keypoint, Landmark, LandmarkFrame};

/// Minimum-confidence predicate applied before a landmark is used.
///
/// Absent landmarks never pass. Evaluators use [`ConfidenceGate::STANDARD`];
/// side/role decisions use the stricter [`ConfidenceGate::ROLE`]; the
/// smoother accepts new samples through [`ConfidenceGate::SMOOTHING`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceGate {
    pub threshold: f32,
    /// Whether a confidence equal to the threshold passes
    pub inclusive: bool,
}

impl ConfidenceGate {
    pub const STANDARD: ConfidenceGate = ConfidenceGate::above(0.5);
    pub const ROLE: ConfidenceGate = ConfidenceGate::at_least(0.6);
    pub const SMOOTHING: ConfidenceGate = ConfidenceGate::at_least(0.4);

    /// Passes when `confidence > threshold`
    pub const fn above(threshold: f32) -> Self {
        Self {
            threshold,
            inclusive: false,
        }
    }

    /// Passes when `confidence >= threshold`
    pub const fn at_least(threshold: f32) -> Self {
        Self {
            threshold,
            inclusive: true,
        }
    }

    pub fn passes(&self, confidence: f32) -> bool {
        if self.inclusive {
            confidence >= self.threshold
        } else {
            confidence > self.threshold
        }
    }

    pub fn is_usable(&self, landmark: Option<&Landmark>) -> bool {
        landmark.is_some_and(|lm| self.passes(lm.confidence))
    }

    pub fn select(&self, frame: &LandmarkFrame, keypoint: Keypoint) -> Option<Landmark> {
        frame
            .get(keypoint)
            .filter(|lm| self.passes(lm.confidence))
            .copied()
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::STANDARD
    }
}
