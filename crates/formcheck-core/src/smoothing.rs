//! Exponential moving-average smoothing of landmark positions.
//!
//! Only the last smoothed frame is retained. A sample that is absent or
//! fails the smoothing gate leaves the prior smoothed value untouched, so
//! a single dropped detection never makes a joint jump to zero.

use serde::{Deserialize, Serialize};

use crate::gate::ConfidenceGate;
use crate::types::{Landmark, LandmarkFrame};

/// Weight given to the newest sample
pub const DEFAULT_ALPHA: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub gate: ConfidenceGate,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            gate: ConfidenceGate::SMOOTHING,
        }
    }
}

/// One smoothing step. Output has the same shape as `raw` and carries its timestamp.
pub fn smooth(
    prev: Option<&LandmarkFrame>,
    raw: &LandmarkFrame,
    alpha: f64,
    gate: &ConfidenceGate,
) -> LandmarkFrame {
    let Some(prev) = prev else {
        return raw.clone();
    };

    let mut out = LandmarkFrame::empty(raw.timestamp);
    for (i, slot) in out.landmarks.iter_mut().enumerate() {
        *slot = match (prev.landmarks[i], raw.landmarks[i]) {
            (None, current) => current,
            (Some(p), Some(r)) if gate.passes(r.confidence) => Some(Landmark::new(
                alpha * r.x + (1.0 - alpha) * p.x,
                alpha * r.y + (1.0 - alpha) * p.y,
                r.confidence,
            )),
            (Some(p), _) => Some(p),
        };
    }
    out
}

/// Stateful smoother owned by one session
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    params: SmoothingParams,
    state: Option<LandmarkFrame>,
}

impl LandmarkSmoother {
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            params: SmoothingParams {
                alpha: params.alpha.clamp(f64::EPSILON, 1.0),
                gate: params.gate,
            },
            state: None,
        }
    }

    pub fn params(&self) -> &SmoothingParams {
        &self.params
    }

    /// Folds `raw` into the smoothed state and returns the new smoothed frame.
    pub fn update(&mut self, raw: &LandmarkFrame) -> &LandmarkFrame {
        let next = smooth(self.state.as_ref(), raw, self.params.alpha, &self.params.gate);
        self.state.insert(next)
    }

    pub fn current(&self) -> Option<&LandmarkFrame> {
        self.state.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(SmoothingParams::default())
    }
}
