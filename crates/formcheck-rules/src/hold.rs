//! Hold timing for isometric exercises.

use formcheck_core::Timestamp;

/// Continuous hold duration measured from the session start
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoldTimer {
    started_at: Option<Timestamp>,
    held_secs: f64,
}

impl HoldTimer {
    pub fn start(at: Timestamp) -> Self {
        Self {
            started_at: Some(at),
            held_secs: 0.0,
        }
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    /// Advances to `now` and returns the hold in seconds. An unstarted timer starts at `now`.
    pub fn tick(&mut self, now: Timestamp) -> f64 {
        let start = *self.started_at.get_or_insert(now);
        self.held_secs = now.secs_since(start);
        self.held_secs
    }

    pub fn held_secs(&self) -> f64 {
        self.held_secs
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
