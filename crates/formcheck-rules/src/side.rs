//! Sticky choice of the body side an evaluator measures.
//!
//! Picking the side afresh every frame lets a near-tie flip the evaluated leg
//! or arm back and forth. The lock only hands over to the other side once it
//! has won by a clear margin for several consecutive frames.

use formcheck_core::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SidePolicy {
    /// Score advantage the challenger needs over the locked side
    pub margin: f64,
    /// Consecutive frames the advantage must persist
    pub confirm_frames: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideLock {
    locked: Option<Side>,
    challenger_frames: u32,
}

impl SideLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds this frame's per-side scores (higher wins, ties go left) and
    /// returns the side to use. With no scores at all the lock is kept.
    pub fn update(&mut self, left: Option<f64>, right: Option<f64>, policy: &SidePolicy) -> Option<Side> {
        let candidate = match (left, right) {
            (None, None) => return self.locked,
            (Some(_), None) => Side::Left,
            (None, Some(_)) => Side::Right,
            (Some(l), Some(r)) if l >= r => Side::Left,
            _ => Side::Right,
        };
        let score = |side: Side| match side {
            Side::Left => left,
            Side::Right => right,
        };

        let Some(current) = self.locked else {
            self.locked = Some(candidate);
            return self.locked;
        };

        if candidate == current {
            self.challenger_frames = 0;
            return self.locked;
        }

        let decisive = match (score(candidate), score(current)) {
            (Some(c), Some(l)) => c - l > policy.margin,
            _ => true,
        };
        if decisive {
            self.challenger_frames += 1;
            if self.challenger_frames >= policy.confirm_frames {
                tracing::debug!(from = ?current, to = ?candidate, "side lock switched");
                self.locked = Some(candidate);
                self.challenger_frames = 0;
            }
        } else {
            self.challenger_frames = 0;
        }
        self.locked
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
