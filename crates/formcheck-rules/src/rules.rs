//! The exercise strategy seam.
//!
//! Every exercise is an [`ExerciseRules`] implementation: it picks the
//! landmarks it needs, turns them into scalar features, judges those features
//! as form checks and describes the movement to the rep machine. The engine
//! holds strategies behind the object-safe [`FormEvaluator`] trait.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use formcheck_core::{ConfidenceGate, Error, Joint, Landmark, LandmarkFrame, Side};
use serde::{Deserialize, Serialize};

use crate::deadlift::DeadliftRules;
use crate::hysteresis::HysteresisBand;
use crate::lunge::LungeRules;
use crate::metrics::{ExerciseMetrics, FormCheck};
use crate::plank::PlankRules;
use crate::position::PositionGate;
use crate::pushup::PushupRules;
use crate::reps::{PhaseRules, PhaseSignal};
use crate::side::SideLock;
use crate::squat::SquatRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseKind {
    Squat,
    Lunge,
    Deadlift,
    Plank,
    #[serde(alias = "push-up", alias = "push_up")]
    Pushup,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 5] = [
        ExerciseKind::Squat,
        ExerciseKind::Lunge,
        ExerciseKind::Deadlift,
        ExerciseKind::Plank,
        ExerciseKind::Pushup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Squat => "squat",
            ExerciseKind::Lunge => "lunge",
            ExerciseKind::Deadlift => "deadlift",
            ExerciseKind::Plank => "plank",
            ExerciseKind::Pushup => "pushup",
        }
    }

    /// Default strategy for this exercise
    pub fn evaluator(&self) -> Box<dyn FormEvaluator> {
        match self {
            ExerciseKind::Squat => Box::new(SquatRules),
            ExerciseKind::Lunge => Box::new(LungeRules),
            ExerciseKind::Deadlift => Box::new(DeadliftRules),
            ExerciseKind::Plank => Box::new(PlankRules),
            ExerciseKind::Pushup => Box::new(PushupRules),
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        ExerciseKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| Error::Config(format!("unknown exercise: {s}")))
    }
}

/// Inputs available to an evaluator for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    /// Frame as delivered by the pose model (raw confidences)
    pub raw: &'a LandmarkFrame,
    /// Frame after temporal smoothing (geometry is read from here)
    pub smoothed: &'a LandmarkFrame,
    pub frame_width: f64,
}

/// Per-session state owned by the strategies: latched flags, the locked
/// side and the position gate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMemory {
    flags: HashMap<&'static str, bool>,
    pub side: SideLock,
    pub position: PositionGate,
}

impl RuleMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, name: &str, initial: bool) -> bool {
        self.flags.get(name).copied().unwrap_or(initial)
    }

    /// Runs `feature` through `band` starting from the stored flag and stores the result.
    pub fn latch(&mut self, name: &'static str, band: &HysteresisBand, initial: bool, feature: Option<f64>) -> bool {
        let next = band.apply(self.flag(name, initial), feature);
        self.flags.insert(name, next);
        next
    }
}

/// Left and right instances of one joint after gating
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LandmarkPair {
    pub left: Option<Landmark>,
    pub right: Option<Landmark>,
}

impl LandmarkPair {
    pub fn select(frame: &LandmarkFrame, joint: Joint, gate: &ConfidenceGate) -> Self {
        Self {
            left: gate.select(frame, Side::Left.keypoint(joint)),
            right: gate.select(frame, Side::Right.keypoint(joint)),
        }
    }

    pub fn side(&self, side: Side) -> Option<Landmark> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn both(&self) -> Option<(Landmark, Landmark)> {
        Some((self.left?, self.right?))
    }
}

/// A single exercise's form rules
pub trait ExerciseRules: Send + Sync {
    type Landmarks;
    type Features;

    const KIND: ExerciseKind;
    /// Feedback line when every check passes
    const ALL_CLEAR: &'static str;

    fn select_landmarks(&self, ctx: &FrameContext<'_>, memory: &mut RuleMemory) -> Self::Landmarks;

    fn compute_features(
        &self,
        landmarks: &Self::Landmarks,
        ctx: &FrameContext<'_>,
        memory: &mut RuleMemory,
    ) -> Self::Features;

    fn evaluate_faults(&self, features: &Self::Features) -> Vec<FormCheck>;

    /// Rep machine timing; `None` for hold-based exercises
    fn phase_rules(&self) -> Option<PhaseRules>;

    fn phase_signal(&self, features: &Self::Features) -> Option<PhaseSignal>;

    fn metrics(&self, features: &Self::Features) -> ExerciseMetrics;

    fn measured_side(&self, _landmarks: &Self::Landmarks) -> Option<Side> {
        None
    }
}

/// Everything one strategy says about one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub metrics: ExerciseMetrics,
    pub checks: Vec<FormCheck>,
    pub signal: Option<PhaseSignal>,
    pub side: Option<Side>,
}

/// Object-safe view of an [`ExerciseRules`] strategy
pub trait FormEvaluator: Send + Sync {
    fn kind(&self) -> ExerciseKind;
    fn all_clear(&self) -> &'static str;
    fn rep_rules(&self) -> Option<PhaseRules>;
    fn evaluate(&self, ctx: &FrameContext<'_>, memory: &mut RuleMemory) -> Evaluation;
}

impl<R: ExerciseRules> FormEvaluator for R {
    fn kind(&self) -> ExerciseKind {
        R::KIND
    }

    fn all_clear(&self) -> &'static str {
        R::ALL_CLEAR
    }

    fn rep_rules(&self) -> Option<PhaseRules> {
        self.phase_rules()
    }

    fn evaluate(&self, ctx: &FrameContext<'_>, memory: &mut RuleMemory) -> Evaluation {
        let landmarks = self.select_landmarks(ctx, memory);
        let features = self.compute_features(&landmarks, ctx, memory);
        Evaluation {
            checks: self.evaluate_faults(&features),
            signal: self.phase_signal(&features),
            metrics: self.metrics(&features),
            side: self.measured_side(&landmarks),
        }
    }
}
