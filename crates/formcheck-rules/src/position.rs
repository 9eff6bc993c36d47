//! Slow-to-change "subject is in position" gate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPolicy {
    /// Consecutive passing frames before entering position
    pub enter_frames: u32,
    /// Consecutive failing frames before leaving position
    pub exit_frames: u32,
}

impl Default for PositionPolicy {
    fn default() -> Self {
        Self {
            enter_frames: 5,
            exit_frames: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionGate {
    in_position: bool,
    pass_streak: u32,
    fail_streak: u32,
}

impl PositionGate {
    pub fn in_position(&self) -> bool {
        self.in_position
    }

    /// Records one frame's raw verdict and returns the debounced state.
    pub fn update(&mut self, passing: bool, policy: &PositionPolicy) -> bool {
        if passing {
            self.pass_streak = self.pass_streak.saturating_add(1);
            self.fail_streak = 0;
        } else {
            self.fail_streak = self.fail_streak.saturating_add(1);
            self.pass_streak = 0;
        }

        if !self.in_position && self.pass_streak >= policy.enter_frames {
            tracing::debug!("subject in position");
            self.in_position = true;
        }
        if self.in_position && self.fail_streak >= policy.exit_frames {
            tracing::debug!("subject out of position");
            self.in_position = false;
        }
        self.in_position
    }
}
