//! Push-up rules: chest depth, rigid torso, lockout and a position gate.
//!
//! Reps only progress while the subject is set up in a push-up: body roughly
//! horizontal, long enough in frame, hands under shoulders and hips below
//! shoulders. The gate reads raw confidences (what the model actually saw)
//! and smoothed geometry, and debounces its verdict through
//! [`PositionGate`](crate::position::PositionGate).

use formcheck_core::{angle, geometry, ConfidenceGate, Joint, Landmark, Side};
use serde::{Deserialize, Serialize};

use crate::metrics::{ExerciseMetrics, FormCheck};
use crate::position::PositionPolicy;
use crate::reps::{PhaseRules, PhaseSignal};
use crate::rules::{ExerciseKind, ExerciseRules, FrameContext, LandmarkPair, RuleMemory};
use crate::side::SidePolicy;

pub const DEPTH_ELBOW_MAX: f64 = 95.0;
pub const LOCKOUT_ELBOW_MIN: f64 = 160.0;
pub const TORSO_MAX_DEVIATION: f64 = 0.08;
const LEAVE_BOTTOM_ELBOW: f64 = DEPTH_ELBOW_MAX + 10.0;
const MAX_BODY_TILT_DEG: f64 = 25.0;
const MIN_BODY_FRACTION: f64 = 0.35;
const WRIST_STACK_RATIO: f64 = 0.4;
const HIP_BELOW_SHOULDER_PX: f64 = 10.0;
const NEUTRAL_ELBOW: f64 = 180.0;

const SIDE_JOINTS: [Joint; 6] = [
    Joint::Shoulder,
    Joint::Elbow,
    Joint::Wrist,
    Joint::Hip,
    Joint::Knee,
    Joint::Ankle,
];
const POSITION_JOINTS: [Joint; 5] = [Joint::Shoulder, Joint::Elbow, Joint::Wrist, Joint::Hip, Joint::Ankle];
const SIDE_POLICY: SidePolicy = SidePolicy {
    margin: 0.5,
    confirm_frames: 5,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PushupMetrics {
    /// Elbow angle on the measured side
    pub elbow_angle: f64,
    /// Smaller elbow angle of both arms, used for rep phases
    pub rep_elbow_angle: f64,
    pub chest_depth_good: bool,
    pub torso_rigid: bool,
    pub elbow_lockout: bool,
    pub in_position: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PushupLandmarks {
    pub side: Side,
    pub shoulders: LandmarkPair,
    pub elbows: LandmarkPair,
    pub wrists: LandmarkPair,
    pub hips: LandmarkPair,
    pub ankles: LandmarkPair,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PushupRules;

fn torso_deviation(s: &Landmark, h: &Landmark, a: &Landmark) -> f64 {
    geometry::point_line_deviation(h, s, a)
}

impl PushupRules {
    /// Single-frame verdict on whether the subject is set up for push-ups.
    pub fn assess_position(ctx: &FrameContext<'_>, preferred: Side) -> bool {
        let complete = |side: Side| {
            POSITION_JOINTS
                .iter()
                .all(|j| ctx.raw.usable(side.keypoint(*j), &ConfidenceGate::ROLE).is_some())
        };
        let side = if complete(preferred) {
            preferred
        } else if complete(preferred.opposite()) {
            preferred.opposite()
        } else {
            return false;
        };

        let pick = |j: Joint| ctx.smoothed.usable(side.keypoint(j), &ConfidenceGate::STANDARD);
        let (Some(s), Some(e), Some(w), Some(h), Some(a)) = (
            pick(Joint::Shoulder),
            pick(Joint::Elbow),
            pick(Joint::Wrist),
            pick(Joint::Hip),
            pick(Joint::Ankle),
        ) else {
            return false;
        };

        if geometry::distance(&s, &a) < MIN_BODY_FRACTION * ctx.frame_width {
            return false;
        }

        let horizontal = geometry::horizontal_tilt(&s, &a) < MAX_BODY_TILT_DEG;
        let rigid = torso_deviation(&s, &h, &a) < TORSO_MAX_DEVIATION;
        let upper_arm = match geometry::distance(&s, &e) {
            d if d > 0.0 => d,
            _ => 1.0,
        };
        let stacked = (s.x - w.x).abs() < WRIST_STACK_RATIO * upper_arm;
        let hips_below = h.y > s.y + HIP_BELOW_SHOULDER_PX;

        horizontal && rigid && stacked && hips_below
    }
}

impl ExerciseRules for PushupRules {
    type Landmarks = PushupLandmarks;
    type Features = PushupMetrics;

    const KIND: ExerciseKind = ExerciseKind::Pushup;
    const ALL_CLEAR: &'static str = "Excellent rep!";

    fn select_landmarks(&self, ctx: &FrameContext<'_>, memory: &mut RuleMemory) -> PushupLandmarks {
        let side = memory
            .side
            .update(
                Some(ctx.smoothed.side_confidence(Side::Left, &SIDE_JOINTS)),
                Some(ctx.smoothed.side_confidence(Side::Right, &SIDE_JOINTS)),
                &SIDE_POLICY,
            )
            .unwrap_or(Side::Left);

        let gate = ConfidenceGate::STANDARD;
        PushupLandmarks {
            side,
            shoulders: LandmarkPair::select(ctx.smoothed, Joint::Shoulder, &gate),
            elbows: LandmarkPair::select(ctx.smoothed, Joint::Elbow, &gate),
            wrists: LandmarkPair::select(ctx.smoothed, Joint::Wrist, &gate),
            hips: LandmarkPair::select(ctx.smoothed, Joint::Hip, &gate),
            ankles: LandmarkPair::select(ctx.smoothed, Joint::Ankle, &gate),
        }
    }

    fn compute_features(&self, lm: &PushupLandmarks, ctx: &FrameContext<'_>, memory: &mut RuleMemory) -> PushupMetrics {
        let elbow = |side: Side| angle(lm.shoulders.side(side), lm.elbows.side(side), lm.wrists.side(side));
        let elbow_angle = elbow(lm.side).unwrap_or(NEUTRAL_ELBOW);
        let rep_elbow_angle = elbow(Side::Left)
            .unwrap_or(NEUTRAL_ELBOW)
            .min(elbow(Side::Right).unwrap_or(NEUTRAL_ELBOW));

        let torso_rigid = match (lm.shoulders.side(lm.side), lm.hips.side(lm.side), lm.ankles.side(lm.side)) {
            (Some(s), Some(h), Some(a)) => torso_deviation(&s, &h, &a) < TORSO_MAX_DEVIATION,
            _ => true,
        };

        let verdict = Self::assess_position(ctx, lm.side);
        let in_position = memory.position.update(verdict, &PositionPolicy::default());

        PushupMetrics {
            elbow_angle,
            rep_elbow_angle,
            chest_depth_good: elbow_angle < DEPTH_ELBOW_MAX,
            torso_rigid,
            elbow_lockout: elbow_angle > LOCKOUT_ELBOW_MIN,
            in_position,
        }
    }

    fn evaluate_faults(&self, f: &PushupMetrics) -> Vec<FormCheck> {
        vec![
            FormCheck::depth("chest_depth", f.chest_depth_good, "Lower to ~90° elbow bend"),
            FormCheck::posture(
                "torso_rigid",
                f.torso_rigid,
                "Keep torso rigid\u{2014}avoid hips sagging/piking",
            ),
            FormCheck::lockout("elbow_lockout", f.elbow_lockout, "Lock out fully at the top"),
        ]
    }

    fn phase_rules(&self) -> Option<PhaseRules> {
        Some(PhaseRules {
            hold_frames: 2,
            debounce_ms: 350.0,
        })
    }

    fn phase_signal(&self, f: &PushupMetrics) -> Option<PhaseSignal> {
        Some(PhaseSignal {
            at_bottom: f.rep_elbow_angle < DEPTH_ELBOW_MAX,
            leaving_bottom: f.rep_elbow_angle > LEAVE_BOTTOM_ELBOW,
            at_top: f.rep_elbow_angle > LOCKOUT_ELBOW_MIN,
            bottom_ok: f.chest_depth_good && f.torso_rigid,
            top_ok: f.elbow_lockout && f.torso_rigid,
            engaged: f.in_position,
        })
    }

    fn metrics(&self, f: &PushupMetrics) -> ExerciseMetrics {
        ExerciseMetrics::Pushup(*f)
    }

    fn measured_side(&self, lm: &PushupLandmarks) -> Option<Side> {
        Some(lm.side)
    }
}
