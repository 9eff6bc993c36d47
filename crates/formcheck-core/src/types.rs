//! Fundamental types for the Formcheck engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gate::ConfidenceGate;

/// Session identifier attached to summaries handed to session logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Timestamp wrapper with nanosecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    fn nanos_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0).max(0)
    }

    /// Milliseconds elapsed since `earlier`, clamped at zero.
    pub fn millis_since(&self, earlier: Timestamp) -> f64 {
        self.nanos_since(earlier) as f64 / 1_000_000.0
    }

    /// Seconds elapsed since `earlier`, clamped at zero.
    pub fn secs_since(&self, earlier: Timestamp) -> f64 {
        self.nanos_since(earlier) as f64 / 1_000_000_000.0
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0)
    }
}

/// Body side, as seen by the pose model (not mirrored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Keypoint for a paired joint on this side
    pub fn keypoint(&self, joint: Joint) -> Keypoint {
        use Keypoint::*;
        match (self, joint) {
            (Side::Left, Joint::Eye) => LeftEye,
            (Side::Right, Joint::Eye) => RightEye,
            (Side::Left, Joint::Ear) => LeftEar,
            (Side::Right, Joint::Ear) => RightEar,
            (Side::Left, Joint::Shoulder) => LeftShoulder,
            (Side::Right, Joint::Shoulder) => RightShoulder,
            (Side::Left, Joint::Elbow) => LeftElbow,
            (Side::Right, Joint::Elbow) => RightElbow,
            (Side::Left, Joint::Wrist) => LeftWrist,
            (Side::Right, Joint::Wrist) => RightWrist,
            (Side::Left, Joint::Hip) => LeftHip,
            (Side::Right, Joint::Hip) => RightHip,
            (Side::Left, Joint::Knee) => LeftKnee,
            (Side::Right, Joint::Knee) => RightKnee,
            (Side::Left, Joint::Ankle) => LeftAnkle,
            (Side::Right, Joint::Ankle) => RightAnkle,
        }
    }
}

/// Paired (left/right) anatomical joints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Joint {
    Eye,
    Ear,
    Shoulder,
    Elbow,
    Wrist,
    Hip,
    Knee,
    Ankle,
}

/// 17-joint skeletal keypoint definition (COCO format)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Keypoint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl Keypoint {
    pub const COUNT: usize = 17;

    pub const ALL: [Keypoint; Keypoint::COUNT] = [
        Keypoint::Nose,
        Keypoint::LeftEye,
        Keypoint::RightEye,
        Keypoint::LeftEar,
        Keypoint::RightEar,
        Keypoint::LeftShoulder,
        Keypoint::RightShoulder,
        Keypoint::LeftElbow,
        Keypoint::RightElbow,
        Keypoint::LeftWrist,
        Keypoint::RightWrist,
        Keypoint::LeftHip,
        Keypoint::RightHip,
        Keypoint::LeftKnee,
        Keypoint::RightKnee,
        Keypoint::LeftAnkle,
        Keypoint::RightAnkle,
    ];

    pub fn from_index(idx: u8) -> Option<Self> {
        Self::ALL.get(idx as usize).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Skeleton edges drawn by the overlay
    pub fn skeleton_pairs() -> &'static [(Keypoint, Keypoint)] {
        &[
            (Keypoint::LeftShoulder, Keypoint::RightShoulder),
            (Keypoint::LeftHip, Keypoint::RightHip),
            (Keypoint::LeftShoulder, Keypoint::LeftElbow),
            (Keypoint::LeftElbow, Keypoint::LeftWrist),
            (Keypoint::RightShoulder, Keypoint::RightElbow),
            (Keypoint::RightElbow, Keypoint::RightWrist),
            (Keypoint::LeftHip, Keypoint::LeftKnee),
            (Keypoint::LeftKnee, Keypoint::LeftAnkle),
            (Keypoint::RightHip, Keypoint::RightKnee),
            (Keypoint::RightKnee, Keypoint::RightAnkle),
            (Keypoint::LeftShoulder, Keypoint::LeftHip),
            (Keypoint::RightShoulder, Keypoint::RightHip),
            (Keypoint::Nose, Keypoint::LeftEye),
            (Keypoint::Nose, Keypoint::RightEye),
            (Keypoint::LeftEye, Keypoint::LeftEar),
            (Keypoint::RightEye, Keypoint::RightEar),
        ]
    }
}

/// A single body landmark in image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub confidence: f32,
}

impl Landmark {
    pub fn new(x: f64, y: f64, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.confidence.is_finite()
    }
}

/// One pose-model output: 17 optional landmarks in COCO order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub timestamp: Timestamp,
    pub landmarks: [Option<Landmark>; Keypoint::COUNT],
}

impl LandmarkFrame {
    /// Values per landmark in the flat wire layout: x, y, confidence
    pub const STRIDE: usize = 3;

    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            landmarks: [None; Keypoint::COUNT],
        }
    }

    /// Builds a frame from up to 17 entries; missing trailing entries are absent.
    pub fn from_landmarks<I>(timestamp: Timestamp, landmarks: I) -> Self
    where
        I: IntoIterator<Item = Option<Landmark>>,
    {
        let mut frame = Self::empty(timestamp);
        for (slot, lm) in frame.landmarks.iter_mut().zip(landmarks) {
            *slot = lm.filter(Landmark::is_finite);
        }
        frame
    }

    /// Parses the flat `[x0, y0, c0, x1, y1, c1, ...]` layout emitted by pose models.
    pub fn from_flat(values: &[f32], timestamp: Timestamp) -> Result<Self> {
        let expected = Keypoint::COUNT * Self::STRIDE;
        if values.len() != expected {
            return Err(Error::InvalidFrame {
                expected,
                actual: values.len(),
            });
        }

        Ok(Self::from_landmarks(
            timestamp,
            values
                .chunks_exact(Self::STRIDE)
                .map(|c| Some(Landmark::new(c[0] as f64, c[1] as f64, c[2]))),
        ))
    }

    pub fn with_landmark(mut self, keypoint: Keypoint, landmark: Landmark) -> Self {
        self.set(keypoint, Some(landmark));
        self
    }

    pub fn get(&self, keypoint: Keypoint) -> Option<&Landmark> {
        self.landmarks[keypoint.index()].as_ref()
    }

    pub fn set(&mut self, keypoint: Keypoint, landmark: Option<Landmark>) {
        self.landmarks[keypoint.index()] = landmark.filter(Landmark::is_finite);
    }

    /// Landmark for `keypoint` only if it passes `gate`
    pub fn usable(&self, keypoint: Keypoint, gate: &ConfidenceGate) -> Option<Landmark> {
        gate.select(self, keypoint)
    }

    /// Sum of confidences of the given keypoints on one side (absent counts as 0)
    pub fn side_confidence(&self, side: Side, joints: &[Joint]) -> f64 {
        joints
            .iter()
            .filter_map(|j| self.get(side.keypoint(*j)))
            .map(|lm| lm.confidence as f64)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.iter().all(Option::is_none)
    }

    pub fn present_count(&self) -> usize {
        self.landmarks.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_roundtrip() {
        for i in 0..Keypoint::COUNT as u8 {
            let kp = Keypoint::from_index(i).unwrap();
            assert_eq!(kp as u8, i);
        }
        assert!(Keypoint::from_index(17).is_none());
    }

    #[test]
    fn test_side_keypoints() {
        assert_eq!(Side::Right.keypoint(Joint::Hip), Keypoint::RightHip);
        assert_eq!(Side::Left.keypoint(Joint::Wrist), Keypoint::LeftWrist);
        assert_eq!(Side::Left.opposite(), Side::Right);
    }

    #[test]
    fn test_from_flat_rejects_wrong_length() {
        let err = LandmarkFrame::from_flat(&[0.0; 50], Timestamp::from_nanos(0)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidFrame {
                expected: 51,
                actual: 50
            }
        ));
    }

    #[test]
    fn test_from_flat_drops_non_finite_entries() {
        let mut values = vec![1.0f32; 51];
        values[3] = f32::NAN;
        let frame = LandmarkFrame::from_flat(&values, Timestamp::from_nanos(0)).unwrap();
        assert!(frame.get(Keypoint::LeftEye).is_none());
        assert_eq!(frame.present_count(), 16);
    }

    #[test]
    fn test_short_input_pads_absent() {
        let frame = LandmarkFrame::from_landmarks(
            Timestamp::from_nanos(0),
            vec![Some(Landmark::new(1.0, 2.0, 0.9))],
        );
        assert_eq!(frame.present_count(), 1);
        assert!(frame.get(Keypoint::RightAnkle).is_none());
    }

    #[test]
    fn test_timestamp_deltas() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(350);
        assert!((b.millis_since(a) - 250.0).abs() < 1e-9);
        assert_eq!(a.secs_since(b), 0.0);
    }

    #[test]
    fn test_timestamp_extremes_saturate() {
        let (lo, hi) = (Timestamp::from_nanos(i64::MIN), Timestamp::from_nanos(i64::MAX));
        assert_eq!(lo.millis_since(hi), 0.0);
        assert!(hi.millis_since(lo) > 0.0);
        assert!(hi.secs_since(lo).is_finite());
    }
}
