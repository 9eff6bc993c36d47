//! Deadlift rules: neutral back, bar path and lockout.

use formcheck_core::{angle, ConfidenceGate, Joint, Landmark, Side};
use serde::{Deserialize, Serialize};

use crate::metrics::{ExerciseMetrics, FormCheck};
use crate::reps::{PhaseRules, PhaseSignal};
use crate::rules::{ExerciseKind, ExerciseRules, FrameContext, LandmarkPair, RuleMemory};

/// Hip angle above which the lifter is locked out
pub const LOCKOUT_HIP_MIN: f64 = 170.0;
/// Max knee-to-ankle horizontal offset while the bar travels (px)
pub const BAR_PATH_MAX_OFFSET: f64 = 40.0;
const NEUTRAL_BACK_MIN: f64 = 160.0;
const DEEP_HINGE_MAX: f64 = 100.0;
const HINGED_HIP_MAX: f64 = 120.0;
const LEAVE_HINGE_HIP: f64 = 130.0;
const NEUTRAL_HIP: f64 = 170.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeadliftMetrics {
    /// Back angle proxy; currently the hip opening
    pub back_angle: f64,
    pub hip_angle: f64,
    pub back_straight: bool,
    pub bar_path: bool,
    pub lockout: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeadliftLandmarks {
    pub shoulders: LandmarkPair,
    pub hips: LandmarkPair,
    pub knees: LandmarkPair,
    pub ankles: LandmarkPair,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeadliftRules;

fn knee_over_ankle(knee: Option<Landmark>, ankle: Option<Landmark>) -> bool {
    match (knee, ankle) {
        (Some(k), Some(a)) => (k.x - a.x).abs() < BAR_PATH_MAX_OFFSET,
        _ => true,
    }
}

impl ExerciseRules for DeadliftRules {
    type Landmarks = DeadliftLandmarks;
    type Features = DeadliftMetrics;

    const KIND: ExerciseKind = ExerciseKind::Deadlift;
    const ALL_CLEAR: &'static str = "Excellent form! Keep it up!";

    fn select_landmarks(&self, ctx: &FrameContext<'_>, _memory: &mut RuleMemory) -> DeadliftLandmarks {
        let gate = ConfidenceGate::STANDARD;
        DeadliftLandmarks {
            shoulders: LandmarkPair::select(ctx.smoothed, Joint::Shoulder, &gate),
            hips: LandmarkPair::select(ctx.smoothed, Joint::Hip, &gate),
            knees: LandmarkPair::select(ctx.smoothed, Joint::Knee, &gate),
            ankles: LandmarkPair::select(ctx.smoothed, Joint::Ankle, &gate),
        }
    }

    fn compute_features(
        &self,
        lm: &DeadliftLandmarks,
        _ctx: &FrameContext<'_>,
        _memory: &mut RuleMemory,
    ) -> DeadliftMetrics {
        let hip_angle = [Side::Left, Side::Right]
            .into_iter()
            .filter_map(|s| angle(lm.shoulders.side(s), lm.hips.side(s), lm.knees.side(s)))
            .reduce(f64::max)
            .unwrap_or(NEUTRAL_HIP);
        let back_angle = hip_angle;

        DeadliftMetrics {
            back_angle,
            hip_angle,
            // either standing tall or in a deep, deliberate hinge
            back_straight: back_angle > NEUTRAL_BACK_MIN || back_angle < DEEP_HINGE_MAX,
            bar_path: knee_over_ankle(lm.knees.left, lm.ankles.left)
                && knee_over_ankle(lm.knees.right, lm.ankles.right),
            lockout: back_angle > LOCKOUT_HIP_MIN,
        }
    }

    fn evaluate_faults(&self, f: &DeadliftMetrics) -> Vec<FormCheck> {
        vec![
            FormCheck::posture(
                "back_straight",
                f.back_straight,
                "Keep your back neutral - avoid rounding your spine",
            ),
            FormCheck::posture(
                "bar_path",
                f.bar_path,
                "Keep the bar close to your body throughout the lift",
            ),
            FormCheck::lockout(
                "lockout",
                f.lockout,
                "Lock out fully at the top - stand tall with shoulders back",
            ),
        ]
    }

    fn phase_rules(&self) -> Option<PhaseRules> {
        Some(PhaseRules {
            hold_frames: 3,
            debounce_ms: 250.0,
        })
    }

    fn phase_signal(&self, f: &DeadliftMetrics) -> Option<PhaseSignal> {
        Some(PhaseSignal::new(
            f.hip_angle < HINGED_HIP_MAX,
            f.hip_angle > LEAVE_HINGE_HIP,
            f.lockout,
        ))
    }

    fn metrics(&self, f: &DeadliftMetrics) -> ExerciseMetrics {
        ExerciseMetrics::Deadlift(*f)
    }
}
