//! Plank rules: straight body line, hip sag/pike and shoulder stacking.

use formcheck_core::{geometry, ConfidenceGate, Joint, Landmark, Side};
use serde::{Deserialize, Serialize};

use crate::metrics::{ExerciseMetrics, FormCheck};
use crate::reps::{PhaseRules, PhaseSignal};
use crate::rules::{ExerciseKind, ExerciseRules, FrameContext, LandmarkPair, RuleMemory};
use crate::side::SidePolicy;

/// Hip distance from the shoulder-ankle line as a fraction of that line
pub const BODY_LINE_MAX_DEVIATION: f64 = 0.06;
/// Hip angle above which the hips sag (reflex angle, hip below the body line)
pub const SAG_HIP_MIN: f64 = 195.0;
/// Hip angle below which the hips pike
pub const PIKE_HIP_MAX: f64 = 150.0;
/// Shoulder-elbow horizontal offset as a fraction of upper-arm length
pub const STACK_MAX_RATIO: f64 = 0.35;

const SIDE_JOINTS: [Joint; 5] = [Joint::Shoulder, Joint::Elbow, Joint::Hip, Joint::Knee, Joint::Ankle];
const SIDE_POLICY: SidePolicy = SidePolicy {
    margin: 0.5,
    confirm_frames: 5,
};
const NEUTRAL_HIP: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlankMetrics {
    pub hip_angle: f64,
    pub straight_line: bool,
    pub hip_sag: bool,
    pub hip_pike: bool,
    pub shoulder_over_elbow: bool,
}

/// One landmark per joint, preferring the locked side
#[derive(Debug, Clone, Copy)]
pub struct PlankLandmarks {
    pub side: Side,
    pub shoulder: Option<Landmark>,
    pub elbow: Option<Landmark>,
    pub hip: Option<Landmark>,
    pub knee: Option<Landmark>,
    pub ankle: Option<Landmark>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlankRules;

impl ExerciseRules for PlankRules {
    type Landmarks = PlankLandmarks;
    type Features = PlankMetrics;

    const KIND: ExerciseKind = ExerciseKind::Plank;
    const ALL_CLEAR: &'static str = "Excellent form! Hold steady.";

    fn select_landmarks(&self, ctx: &FrameContext<'_>, memory: &mut RuleMemory) -> PlankLandmarks {
        let gate = ConfidenceGate::STANDARD;
        let side = memory
            .side
            .update(
                Some(ctx.smoothed.side_confidence(Side::Left, &SIDE_JOINTS)),
                Some(ctx.smoothed.side_confidence(Side::Right, &SIDE_JOINTS)),
                &SIDE_POLICY,
            )
            .unwrap_or(Side::Left);

        let pick = |joint: Joint| {
            let pair = LandmarkPair::select(ctx.smoothed, joint, &gate);
            pair.side(side).or(pair.side(side.opposite()))
        };
        PlankLandmarks {
            side,
            shoulder: pick(Joint::Shoulder),
            elbow: pick(Joint::Elbow),
            hip: pick(Joint::Hip),
            knee: pick(Joint::Knee),
            ankle: pick(Joint::Ankle),
        }
    }

    fn compute_features(&self, lm: &PlankLandmarks, _ctx: &FrameContext<'_>, _memory: &mut RuleMemory) -> PlankMetrics {
        let straight_line = match (lm.shoulder, lm.hip, lm.ankle) {
            (Some(s), Some(h), Some(a)) => geometry::point_line_deviation(&h, &s, &a) < BODY_LINE_MAX_DEVIATION,
            _ => true,
        };

        let hip_angle = geometry::body_line_angle(lm.shoulder, lm.hip, lm.knee).unwrap_or(NEUTRAL_HIP);

        let shoulder_over_elbow = match (lm.shoulder, lm.elbow) {
            (Some(s), Some(e)) => {
                let upper_arm = geometry::distance(&s, &e);
                upper_arm <= 0.0 || (s.x - e.x).abs() < STACK_MAX_RATIO * upper_arm
            }
            _ => true,
        };

        PlankMetrics {
            hip_angle,
            straight_line,
            hip_sag: hip_angle > SAG_HIP_MIN,
            hip_pike: hip_angle < PIKE_HIP_MAX,
            shoulder_over_elbow,
        }
    }

    fn evaluate_faults(&self, f: &PlankMetrics) -> Vec<FormCheck> {
        vec![
            FormCheck::posture(
                "straight_line",
                f.straight_line,
                "Keep a straight line from shoulders to ankles",
            ),
            FormCheck::posture("no_hip_sag", !f.hip_sag, "Lift your hips slightly to avoid sagging"),
            FormCheck::posture("no_hip_pike", !f.hip_pike, "Lower your hips to avoid piking"),
            FormCheck::posture(
                "shoulder_over_elbow",
                f.shoulder_over_elbow,
                "Stack shoulders over elbows",
            ),
        ]
    }

    fn phase_rules(&self) -> Option<PhaseRules> {
        None
    }

    fn phase_signal(&self, _features: &PlankMetrics) -> Option<PhaseSignal> {
        None
    }

    fn metrics(&self, f: &PlankMetrics) -> ExerciseMetrics {
        ExerciseMetrics::Plank(*f)
    }

    fn measured_side(&self, lm: &PlankLandmarks) -> Option<Side> {
        Some(lm.side)
    }
}
