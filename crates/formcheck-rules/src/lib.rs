//! # Formcheck-Rules
//!
//! Exercise form rules and the state machines that count repetitions.
//!
//! ## Pipeline
//!
//! Each frame flows through four stages:
//!
//! 1. **Gate & smooth** - low-confidence landmarks are held at their last
//!    good position (see `formcheck_core::smoothing`)
//! 2. **Features** - the exercise strategy measures joint angles and body lines
//! 3. **Checks** - features become named pass/fail checks with coaching cues,
//!    some latched through hysteresis bands so they do not flicker
//! 4. **Progress** - a rep machine (`TOP -> BOTTOM -> TRANSITION -> TOP`) or a
//!    hold timer turns the movement into a count
//!
//! ## Exercises
//!
//! - **Squat**: knee depth, hip opening, feet under hips
//! - **Lunge**: front/back knee depth, de-rolled torso tilt, front-knee tracking
//! - **Deadlift**: neutral back, bar path, lockout
//! - **Plank**: body line, hip sag/pike, shoulders over elbows
//! - **Push-up**: elbow depth, torso rigidity, lockout, position gate
//!
//! ## Grading
//!
//! No failing check grades a frame excellent, one grades it needs-improvement
//! and two or more grade it poor. Depth and lockout checks stay credited for
//! the rest of the rep once reached.

pub mod analyzer;
pub mod deadlift;
pub mod hold;
pub mod hysteresis;
pub mod lunge;
pub mod metrics;
pub mod plank;
pub mod position;
pub mod pushup;
pub mod reps;
pub mod rules;
pub mod side;
pub mod squat;

#[cfg(test)]
mod fixtures;

pub use analyzer::*;
pub use deadlift::*;
pub use hold::*;
pub use hysteresis::*;
pub use lunge::*;
pub use metrics::*;
pub use plank::*;
pub use position::*;
pub use pushup::*;
pub use reps::*;
pub use rules::*;
pub use side::*;
pub use squat::*;
