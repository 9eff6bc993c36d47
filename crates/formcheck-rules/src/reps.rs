//! Repetition counting state machine.
//!
//! ```text
//! TOP --(bottom held K frames)--> BOTTOM --(leaving bottom)--> TRANSITION
//!  ^                                                              |
//!  +----------(top held K frames; rep++ if debounce elapsed)-----+
//! ```
//!
//! The machine is a value: [`RepState::step`] never mutates, it returns the
//! next state together with the events the frame produced.

use formcheck_core::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepPhase {
    #[default]
    Top,
    Bottom,
    Transition,
}

/// Per-exercise timing rules for the machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseRules {
    /// Consecutive frames a position must hold before it is confirmed
    pub hold_frames: u32,
    /// Minimum interval between two counted reps
    pub debounce_ms: f64,
}

/// What the current frame says about the movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSignal {
    pub at_bottom: bool,
    pub leaving_bottom: bool,
    pub at_top: bool,
    /// Form is acceptable for confirming the bottom
    pub bottom_ok: bool,
    /// Form is acceptable for confirming the top
    pub top_ok: bool,
    /// Subject is set up for the exercise; when false nothing progresses
    pub engaged: bool,
}

impl PhaseSignal {
    pub fn new(at_bottom: bool, leaving_bottom: bool, at_top: bool) -> Self {
        Self {
            at_bottom,
            leaving_bottom,
            at_top,
            bottom_ok: true,
            top_ok: true,
            engaged: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepEvent {
    EnteredBottom,
    LeftBottom,
    RepCounted,
    /// Top reached again inside the debounce interval
    RepSuppressed,
    Disengaged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepState {
    pub phase: RepPhase,
    pub bottom_hold: u32,
    pub top_hold: u32,
    pub last_rep_at: Option<Timestamp>,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepStep {
    pub state: RepState,
    pub events: Vec<RepEvent>,
}

impl RepState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self, signal: &PhaseSignal, now: Timestamp, rules: &PhaseRules) -> RepStep {
        let mut next = *self;
        let mut events = Vec::new();

        if !signal.engaged {
            if next.phase != RepPhase::Top || next.bottom_hold > 0 || next.top_hold > 0 {
                events.push(RepEvent::Disengaged);
            }
            next.bottom_hold = 0;
            next.top_hold = 0;
            next.phase = RepPhase::Top;
            return RepStep { state: next, events };
        }

        if signal.at_bottom {
            next.bottom_hold = next.bottom_hold.saturating_add(1);
            next.top_hold = 0;
        } else if signal.at_top {
            next.top_hold = next.top_hold.saturating_add(1);
            next.bottom_hold = 0;
        } else {
            next.bottom_hold = 0;
            next.top_hold = 0;
        }

        if next.phase != RepPhase::Bottom && next.bottom_hold >= rules.hold_frames && signal.bottom_ok {
            next.phase = RepPhase::Bottom;
            events.push(RepEvent::EnteredBottom);
        }

        if next.phase == RepPhase::Bottom && signal.leaving_bottom {
            next.phase = RepPhase::Transition;
            events.push(RepEvent::LeftBottom);
        }

        if next.phase != RepPhase::Top && next.top_hold >= rules.hold_frames && signal.top_ok {
            // a clock that went backwards restarts the debounce window
            let elapsed = next
                .last_rep_at
                .map_or(true, |last| now < last || now.millis_since(last) > rules.debounce_ms);
            if elapsed {
                next.count += 1;
                next.last_rep_at = Some(now);
                events.push(RepEvent::RepCounted);
            } else {
                events.push(RepEvent::RepSuppressed);
            }
            next.phase = RepPhase::Top;
        }

        RepStep { state: next, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: PhaseRules = PhaseRules {
        hold_frames: 3,
        debounce_ms: 150.0,
    };

    fn bottom() -> PhaseSignal {
        PhaseSignal::new(true, false, false)
    }
    fn middle() -> PhaseSignal {
        PhaseSignal::new(false, true, false)
    }
    fn top() -> PhaseSignal {
        PhaseSignal::new(false, true, true)
    }

    fn run(signals: &[PhaseSignal], start_ms: i64, dt_ms: i64) -> RepState {
        let mut state = RepState::new();
        for (i, s) in signals.iter().enumerate() {
            let now = Timestamp::from_millis(start_ms + i as i64 * dt_ms);
            state = state.step(s, now, &RULES).state;
        }
        state
    }

    #[test]
    fn test_full_cycle_counts_one_rep() {
        let seq = [top(), top(), top(), bottom(), bottom(), bottom(), middle(), top(), top(), top()];
        let state = run(&seq, 0, 33);
        assert_eq!(state.count, 1);
        assert_eq!(state.phase, RepPhase::Top);
    }

    #[test]
    fn test_short_bottom_is_not_confirmed() {
        let seq = [bottom(), bottom(), middle(), top(), top(), top()];
        let state = run(&seq, 0, 33);
        assert_eq!(state.count, 0);
    }

    #[test]
    fn test_oscillation_inside_debounce_adds_nothing() {
        let mut state = RepState::new();
        let mut t = 0;
        for s in [bottom(), bottom(), bottom(), top(), top(), top()] {
            state = state.step(&s, Timestamp::from_millis(t), &RULES).state;
            t += 33;
        }
        assert_eq!(state.count, 1);

        // second full cycle at 10ms per frame confirms the top 83ms after the first rep
        let mut suppressed = false;
        for s in [bottom(), bottom(), bottom(), top(), top(), top()] {
            let step = state.step(&s, Timestamp::from_millis(t), &RULES);
            suppressed |= step.events.contains(&RepEvent::RepSuppressed);
            state = step.state;
            t += 10;
        }
        assert_eq!(state.count, 1);
        assert!(suppressed);
        assert_eq!(state.phase, RepPhase::Top);
    }

    #[test]
    fn test_clock_jump_back_still_counts() {
        let state = run(&[bottom(), bottom(), bottom(), top(), top(), top()], 5_000, 100);
        assert_eq!(state.count, 1);

        let mut state = state;
        for (i, s) in [bottom(), bottom(), bottom(), top(), top(), top()].iter().enumerate() {
            state = state.step(s, Timestamp::from_millis(i as i64 * 100), &RULES).state;
        }
        assert_eq!(state.count, 2);
    }

    #[test]
    fn test_count_never_decreases_and_step_is_pure() {
        let state = run(&[bottom(), bottom(), bottom(), top(), top(), top()], 0, 100);
        let before = state;
        let step = state.step(&middle(), Timestamp::from_millis(10_000), &RULES);
        assert_eq!(state, before);
        assert!(step.state.count >= state.count);
    }

    #[test]
    fn test_bad_form_blocks_bottom() {
        let mut signal = bottom();
        signal.bottom_ok = false;
        let state = run(&[signal, signal, signal, top(), top(), top()], 0, 100);
        assert_eq!(state.count, 0);
    }

    #[test]
    fn test_disengaged_resets_to_top() {
        let state = run(&[bottom(), bottom(), bottom()], 0, 100);
        assert_eq!(state.phase, RepPhase::Bottom);
        let mut off = top();
        off.engaged = false;
        let step = state.step(&off, Timestamp::from_millis(400), &RULES);
        assert_eq!(step.state.phase, RepPhase::Top);
        assert_eq!(step.state.top_hold, 0);
        assert_eq!(step.state.count, 0);
        assert_eq!(step.events, vec![RepEvent::Disengaged]);
    }
}
