//! Lunge rules: front/back knee depth, torso tilt and front-knee tracking.
//!
//! The front leg is the one whose ankle sits farther from the hip centre.
//! That choice is locked per session (see [`crate::side`]) so the two legs
//! do not swap roles when their ankle distances are nearly equal.

use formcheck_core::{angle, geometry, ConfidenceGate, Joint, Landmark, Side};
use serde::{Deserialize, Serialize};

use crate::hysteresis::HysteresisBand;
use crate::metrics::{ExerciseMetrics, FormCheck};
use crate::reps::{PhaseRules, PhaseSignal};
use crate::rules::{ExerciseKind, ExerciseRules, FrameContext, LandmarkPair, RuleMemory};
use crate::side::SidePolicy;

pub const BOTTOM_FRONT_MAX: f64 = 115.0;
pub const BOTTOM_BACK_MAX: f64 = 110.0;
pub const EXIT_FRONT_MIN: f64 = 125.0;
pub const EXIT_BACK_MIN: f64 = 120.0;
pub const TOP_FRONT_MIN: f64 = 165.0;

/// Torso tilt from vertical in degrees: upright below 30, leaning above 35
pub const TORSO_BAND: HysteresisBand = HysteresisBand::strict(30.0, 35.0);
/// Knee-over-ankle offset as a fraction of tibia length
pub const KNEE_TRACK_BAND: HysteresisBand = HysteresisBand::inclusive(0.30, 0.40);

const FRONT_LEG_POLICY: SidePolicy = SidePolicy {
    margin: 20.0,
    confirm_frames: 3,
};
const NEUTRAL_KNEE: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LungeMetrics {
    pub front_knee_angle: f64,
    pub back_knee_angle: f64,
    pub torso_tilt: Option<f64>,
    pub depth: bool,
    pub torso_upright: bool,
    pub knee_alignment: bool,
    pub front_side: Side,
}

#[derive(Debug, Clone, Copy)]
pub struct LungeLandmarks {
    pub shoulders: LandmarkPair,
    pub hips: LandmarkPair,
    pub knees: LandmarkPair,
    pub ankles: LandmarkPair,
    pub front: Side,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LungeRules;

impl LungeRules {
    fn ankle_spread(ctx: &FrameContext<'_>) -> (Option<f64>, Option<f64>) {
        let hips = LandmarkPair::select(ctx.smoothed, Joint::Hip, &ConfidenceGate::ROLE);
        let ankles = LandmarkPair::select(ctx.smoothed, Joint::Ankle, &ConfidenceGate::ROLE);
        let Some((lh, rh)) = hips.both() else {
            return (None, None);
        };
        let center = (lh.x + rh.x) / 2.0;
        let spread = |ankle: Option<Landmark>| ankle.map(|a| (a.x - center).abs());
        (spread(ankles.left), spread(ankles.right))
    }

    /// Torso tilt from vertical after removing the camera roll seen in the shoulder line
    fn torso_tilt(lm: &LungeLandmarks) -> Option<f64> {
        let (ls, rs) = lm.shoulders.both()?;
        let hip_mid = geometry::midpoint_or_either(lm.hips.left, lm.hips.right)?;
        let roll = geometry::line_roll(&ls, &rs);
        let shoulder = if (rs.x - hip_mid.x).abs() > (ls.x - hip_mid.x).abs() {
            rs
        } else {
            ls
        };
        Some(geometry::segment_tilt(&shoulder, &hip_mid, roll))
    }

    fn knee_track_ratio(lm: &LungeLandmarks) -> Option<f64> {
        let knee = lm.knees.side(lm.front)?;
        let ankle = lm.ankles.side(lm.front)?;
        let tibia = geometry::distance(&knee, &ankle);
        (tibia > 0.0).then(|| (knee.x - ankle.x).abs() / tibia)
    }
}

impl ExerciseRules for LungeRules {
    type Landmarks = LungeLandmarks;
    type Features = LungeMetrics;

    const KIND: ExerciseKind = ExerciseKind::Lunge;
    const ALL_CLEAR: &'static str = "Excellent form! Keep it up!";

    fn select_landmarks(&self, ctx: &FrameContext<'_>, memory: &mut RuleMemory) -> LungeLandmarks {
        let (left, right) = Self::ankle_spread(ctx);
        let front = memory
            .side
            .update(left, right, &FRONT_LEG_POLICY)
            .unwrap_or(Side::Left);

        let gate = ConfidenceGate::STANDARD;
        LungeLandmarks {
            shoulders: LandmarkPair::select(ctx.smoothed, Joint::Shoulder, &gate),
            hips: LandmarkPair::select(ctx.smoothed, Joint::Hip, &gate),
            knees: LandmarkPair::select(ctx.smoothed, Joint::Knee, &gate),
            ankles: LandmarkPair::select(ctx.smoothed, Joint::Ankle, &gate),
            front,
        }
    }

    fn compute_features(&self, lm: &LungeLandmarks, _ctx: &FrameContext<'_>, memory: &mut RuleMemory) -> LungeMetrics {
        let knee_angle = |side: Side| {
            angle(lm.hips.side(side), lm.knees.side(side), lm.ankles.side(side)).unwrap_or(NEUTRAL_KNEE)
        };
        let front_knee_angle = knee_angle(lm.front);
        let back_knee_angle = knee_angle(lm.front.opposite());

        let torso_tilt = Self::torso_tilt(lm);
        let torso_upright = memory.latch("torso_upright", &TORSO_BAND, true, torso_tilt);
        let knee_alignment = memory.latch(
            "knee_alignment",
            &KNEE_TRACK_BAND,
            true,
            Self::knee_track_ratio(lm),
        );

        LungeMetrics {
            front_knee_angle,
            back_knee_angle,
            torso_tilt,
            depth: back_knee_angle < BOTTOM_BACK_MAX && front_knee_angle < BOTTOM_FRONT_MAX,
            torso_upright,
            knee_alignment,
            front_side: lm.front,
        }
    }

    fn evaluate_faults(&self, f: &LungeMetrics) -> Vec<FormCheck> {
        vec![
            FormCheck::depth(
                "depth",
                f.depth,
                "Go lower - back knee should nearly touch the ground",
            ),
            FormCheck::posture(
                "torso_upright",
                f.torso_upright,
                "Keep your torso upright - avoid leaning forward",
            ),
            FormCheck::posture(
                "knee_alignment",
                f.knee_alignment,
                "Keep your front knee aligned over your ankle",
            ),
        ]
    }

    fn phase_rules(&self) -> Option<PhaseRules> {
        Some(PhaseRules {
            hold_frames: 3,
            debounce_ms: 150.0,
        })
    }

    fn phase_signal(&self, f: &LungeMetrics) -> Option<PhaseSignal> {
        Some(PhaseSignal::new(
            f.depth,
            f.front_knee_angle > EXIT_FRONT_MIN || f.back_knee_angle > EXIT_BACK_MIN,
            f.front_knee_angle > TOP_FRONT_MIN,
        ))
    }

    fn metrics(&self, f: &LungeMetrics) -> ExerciseMetrics {
        ExerciseMetrics::Lunge(*f)
    }

    fn measured_side(&self, lm: &LungeLandmarks) -> Option<Side> {
        Some(lm.front)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use approx::assert_relative_eq;
    use formcheck_core::{Keypoint, LandmarkFrame};

    fn run(frames: &[LandmarkFrame]) -> Vec<LungeMetrics> {
        let mut memory = RuleMemory::new();
        frames
            .iter()
            .map(|f| {
                let ctx = fixtures::ctx(f);
                let lm = LungeRules.select_landmarks(&ctx, &mut memory);
                LungeRules.compute_features(&lm, &ctx, &mut memory)
            })
            .collect()
    }

    #[test]
    fn test_bottom_position_is_deep() {
        let m = run(&[fixtures::lunge(0, 90.0, 95.0, 5.0)])[0];
        assert_eq!(m.front_side, Side::Left);
        assert_relative_eq!(m.front_knee_angle, 90.0, epsilon = 1e-6);
        assert_relative_eq!(m.back_knee_angle, 95.0, epsilon = 1e-6);
        assert!(m.depth);
        assert!(m.torso_upright);
        assert!(m.knee_alignment);
    }

    #[test]
    fn test_torso_tilt_hysteresis() {
        let tilts = [20.0, 32.0, 20.0, 36.0, 32.0, 29.0];
        let frames: Vec<_> = tilts
            .iter()
            .enumerate()
            .map(|(i, t)| fixtures::lunge(i as i64 * 33, 100.0, 100.0, *t))
            .collect();
        let upright: Vec<bool> = run(&frames).iter().map(|m| m.torso_upright).collect();
        assert_eq!(upright, vec![true, true, true, false, false, true]);
    }

    #[test]
    fn test_tilt_ignores_camera_roll() {
        // upright torso filmed by a camera rolled 10 degrees
        let roll = 10f64.to_radians();
        let (sin, cos) = roll.sin_cos();
        let rotate = |x: f64, y: f64| (320.0 + x * cos - y * sin, 200.0 + x * sin + y * cos);
        let (lx, ly) = rotate(-2.0, -150.0);
        let (rx, ry) = rotate(2.0, -150.0);
        let frame = fixtures::frame(
            0,
            &[
                (Keypoint::LeftShoulder, lx, ly),
                (Keypoint::RightShoulder, rx, ry),
                (Keypoint::LeftHip, 320.0, 200.0),
                (Keypoint::RightHip, 320.0, 200.0),
            ],
        );
        let m = run(&[frame])[0];
        let tilt = m.torso_tilt.unwrap();
        assert!(tilt < 1.0, "tilt {tilt}");
        assert!(m.torso_upright);
    }

    #[test]
    fn test_knee_drift_latches_off() {
        let drifted = |ts| {
            let f = fixtures::lunge(ts, 100.0, 100.0, 5.0);
            let knee = *f.get(Keypoint::LeftKnee).unwrap();
            let ankle = *f.get(Keypoint::LeftAnkle).unwrap();
            // shin drops 100px: 50px forward is past 40%, 35px sits in the band
            f.with_landmark(Keypoint::LeftKnee, Landmark::new(ankle.x + 50.0, knee.y, 0.9))
        };
        let in_band = |ts| {
            let f = fixtures::lunge(ts, 100.0, 100.0, 5.0);
            let knee = *f.get(Keypoint::LeftKnee).unwrap();
            let ankle = *f.get(Keypoint::LeftAnkle).unwrap();
            f.with_landmark(Keypoint::LeftKnee, Landmark::new(ankle.x + 35.0, knee.y, 0.9))
        };
        let m = run(&[in_band(0), drifted(33), in_band(66)]);
        let aligned: Vec<bool> = m.iter().map(|m| m.knee_alignment).collect();
        assert_eq!(aligned, vec![true, false, false]);
    }

    #[test]
    fn test_front_leg_does_not_flip_on_near_tie() {
        let base = fixtures::lunge(0, 100.0, 100.0, 5.0);
        let nudged = |ts: i64, dx: f64| {
            let mut f = base.clone();
            f.timestamp = formcheck_core::Timestamp::from_millis(ts);
            let a = *f.get(Keypoint::RightAnkle).unwrap();
            f.with_landmark(Keypoint::RightAnkle, Landmark::new(a.x - dx, a.y, 0.9))
        };
        // back ankle now 5px farther out than the front one, inside the switch margin
        let m = run(&[base.clone(), nudged(33, 15.0), nudged(66, 15.0), nudged(99, 15.0)]);
        assert!(m.iter().all(|m| m.front_side == Side::Left));
    }

    #[test]
    fn test_standing_signals_top() {
        let m = run(&[fixtures::lunge(0, 175.0, 175.0, 0.0)])[0];
        let s = LungeRules.phase_signal(&m).unwrap();
        assert!(s.at_top);
        assert!(!s.at_bottom);
        assert!(s.leaving_bottom);
    }
}
