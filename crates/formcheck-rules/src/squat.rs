//! Squat rules: knee depth, back angle and weight balance.

use formcheck_core::{angle, geometry, ConfidenceGate, Joint, Side};
use serde::{Deserialize, Serialize};

use crate::metrics::{ExerciseMetrics, FormCheck};
use crate::reps::{PhaseRules, PhaseSignal};
use crate::rules::{ExerciseKind, ExerciseRules, FrameContext, LandmarkPair, RuleMemory};

/// Knee angle below which depth is reached (thighs near parallel)
pub const DEPTH_KNEE_MAX: f64 = 100.0;
/// Hip angle above which the back counts as straight
pub const BACK_HIP_MIN: f64 = 150.0;
/// Allowed horizontal offset between ankle and hip midpoints (px)
pub const BALANCE_MAX_OFFSET: f64 = 40.0;
const LEAVE_BOTTOM_KNEE: f64 = 110.0;
const TOP_KNEE_MIN: f64 = 150.0;
const NEUTRAL_KNEE: f64 = 180.0;
const NEUTRAL_HIP: f64 = 170.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquatMetrics {
    pub knee_angle: f64,
    pub hip_angle: f64,
    pub depth_good: bool,
    pub back_straight: bool,
    pub balance: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SquatLandmarks {
    pub shoulders: LandmarkPair,
    pub hips: LandmarkPair,
    pub knees: LandmarkPair,
    pub ankles: LandmarkPair,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SquatRules;

impl ExerciseRules for SquatRules {
    type Landmarks = SquatLandmarks;
    type Features = SquatMetrics;

    const KIND: ExerciseKind = ExerciseKind::Squat;
    const ALL_CLEAR: &'static str = "Excellent form! Keep it up!";

    fn select_landmarks(&self, ctx: &FrameContext<'_>, _memory: &mut RuleMemory) -> SquatLandmarks {
        let gate = ConfidenceGate::STANDARD;
        SquatLandmarks {
            shoulders: LandmarkPair::select(ctx.smoothed, Joint::Shoulder, &gate),
            hips: LandmarkPair::select(ctx.smoothed, Joint::Hip, &gate),
            knees: LandmarkPair::select(ctx.smoothed, Joint::Knee, &gate),
            ankles: LandmarkPair::select(ctx.smoothed, Joint::Ankle, &gate),
        }
    }

    fn compute_features(&self, lm: &SquatLandmarks, _ctx: &FrameContext<'_>, _memory: &mut RuleMemory) -> SquatMetrics {
        let knee_angles = [Side::Left, Side::Right]
            .map(|s| angle(lm.hips.side(s), lm.knees.side(s), lm.ankles.side(s)));
        let hip_angles = [Side::Left, Side::Right]
            .map(|s| angle(lm.shoulders.side(s), lm.hips.side(s), lm.knees.side(s)));

        // deepest knee and most open hip across the visible sides
        let knee_angle = knee_angles.into_iter().flatten().reduce(f64::min).unwrap_or(NEUTRAL_KNEE);
        let hip_angle = hip_angles.into_iter().flatten().reduce(f64::max).unwrap_or(NEUTRAL_HIP);

        let balance = match (lm.ankles.both(), lm.hips.both()) {
            (Some((la, ra)), Some((lh, rh))) => {
                let feet = geometry::midpoint(&la, &ra);
                let hips = geometry::midpoint(&lh, &rh);
                (feet.x - hips.x).abs() < BALANCE_MAX_OFFSET
            }
            _ => true,
        };

        SquatMetrics {
            knee_angle,
            hip_angle,
            depth_good: knee_angle < DEPTH_KNEE_MAX,
            back_straight: hip_angle > BACK_HIP_MIN,
            balance,
        }
    }

    fn evaluate_faults(&self, f: &SquatMetrics) -> Vec<FormCheck> {
        vec![
            FormCheck::depth(
                "depth",
                f.depth_good,
                "Go deeper - aim to get your thighs parallel to the ground",
            ),
            FormCheck::posture("back_straight", f.back_straight, "Keep your back straight and chest up"),
            FormCheck::posture(
                "balance",
                f.balance,
                "Focus on keeping your weight centered over your feet",
            ),
        ]
    }

    fn phase_rules(&self) -> Option<PhaseRules> {
        Some(PhaseRules {
            hold_frames: 3,
            debounce_ms: 250.0,
        })
    }

    fn phase_signal(&self, f: &SquatMetrics) -> Option<PhaseSignal> {
        Some(PhaseSignal::new(
            f.knee_angle < DEPTH_KNEE_MAX,
            f.knee_angle > LEAVE_BOTTOM_KNEE,
            f.knee_angle > TOP_KNEE_MIN,
        ))
    }

    fn metrics(&self, f: &SquatMetrics) -> ExerciseMetrics {
        ExerciseMetrics::Squat(*f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::rules::FormEvaluator;
    use approx::assert_relative_eq;
    use formcheck_core::{Keypoint, Landmark, LandmarkFrame, Timestamp};

    fn features(frame: &LandmarkFrame) -> SquatMetrics {
        let rules = SquatRules;
        let mut memory = RuleMemory::new();
        let ctx = fixtures::ctx(frame);
        let lm = rules.select_landmarks(&ctx, &mut memory);
        rules.compute_features(&lm, &ctx, &mut memory)
    }

    #[test]
    fn test_depth_threshold_is_strict() {
        let shallow = features(&fixtures::squat(0, 100.1));
        let deep = features(&fixtures::squat(0, 99.9));
        assert_relative_eq!(shallow.knee_angle, 100.1, epsilon = 1e-6);
        assert!(!shallow.depth_good);
        assert!(deep.depth_good);
        assert!(deep.back_straight);
        assert!(deep.balance);
    }

    #[test]
    fn test_missing_legs_fall_back_to_neutral() {
        let f = features(&LandmarkFrame::empty(Timestamp::from_nanos(0)));
        assert_eq!(f.knee_angle, 180.0);
        assert_eq!(f.hip_angle, 170.0);
        assert!(!f.depth_good);
        assert!(f.back_straight);
        assert!(f.balance);
    }

    #[test]
    fn test_balance_flags_offset_feet() {
        let frame = fixtures::squat(0, 120.0)
            .with_landmark(Keypoint::LeftAnkle, Landmark::new(380.0, 340.0, 0.9))
            .with_landmark(Keypoint::RightAnkle, Landmark::new(380.0, 340.0, 0.9));
        assert!(!features(&frame).balance);
    }

    #[test]
    fn test_low_confidence_leg_is_ignored() {
        let frame = fixtures::squat(0, 90.0)
            .with_landmark(Keypoint::RightKnee, Landmark::new(0.0, 0.0, 0.5));
        let f = features(&frame);
        assert_relative_eq!(f.knee_angle, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_checks_and_cues() {
        let mut memory = RuleMemory::new();
        let frame = fixtures::squat(0, 150.0);
        let eval = SquatRules.evaluate(&fixtures::ctx(&frame), &mut memory);
        let failing: Vec<_> = eval.checks.iter().filter(|c| !c.passed).map(|c| c.name).collect();
        assert_eq!(failing, vec!["depth"]);
        assert!(eval.signal.is_some_and(|s| !s.at_bottom && !s.at_top));
    }
}
