//! Synthetic poses with exact joint angles for unit tests.

use formcheck_core::{Keypoint, Landmark, LandmarkFrame, Timestamp};

use crate::rules::FrameContext;

pub const WIDTH: f64 = 640.0;
const CONF: f32 = 0.9;

pub fn frame(ts_ms: i64, points: &[(Keypoint, f64, f64)]) -> LandmarkFrame {
    points.iter().fold(
        LandmarkFrame::empty(Timestamp::from_millis(ts_ms)),
        |f, &(kp, x, y)| f.with_landmark(kp, Landmark::new(x, y, CONF)),
    )
}

pub fn ctx(frame: &LandmarkFrame) -> FrameContext<'_> {
    FrameContext {
        raw: frame,
        smoothed: frame,
        frame_width: WIDTH,
    }
}

/// Point at `len` from `origin` in the direction `deg` away from straight down
/// (positive turns toward +x).
fn from_down(origin: (f64, f64), deg: f64, len: f64) -> (f64, f64) {
    let r = deg.to_radians();
    (origin.0 + len * r.sin(), origin.1 + len * r.cos())
}

/// Hip over ankle with the knee pushed forward so the knee angle is exact.
fn folded_leg(hip: (f64, f64), knee_deg: f64, len: f64) -> ((f64, f64), (f64, f64)) {
    let half = (knee_deg / 2.0).to_radians();
    let span = 2.0 * len * half.sin();
    let knee = (hip.0 + len * half.cos(), hip.1 + span / 2.0);
    let ankle = (hip.0, hip.1 + span);
    (knee, ankle)
}

/// Side-view squat, both legs identical; torso in line with the thigh
pub fn squat(ts_ms: i64, knee_deg: f64) -> LandmarkFrame {
    let hip = (320.0, 200.0);
    let (knee, ankle) = folded_leg(hip, knee_deg, 100.0);
    let shoulder = (hip.0 + 1.5 * (hip.0 - knee.0), hip.1 + 1.5 * (hip.1 - knee.1));
    frame(ts_ms, &bilateral(shoulder, hip, knee, ankle))
}

/// Side-view lunge: left leg in front with a vertical shin, right leg behind
/// with a vertical thigh. `lean_deg` tips the torso forward. The front thigh
/// is longer so the front ankle is always clearly the farther one.
pub fn lunge(ts_ms: i64, front_deg: f64, back_deg: f64, lean_deg: f64) -> LandmarkFrame {
    let hip = (320.0, 200.0);
    let len = 100.0;
    let front_knee = from_down(hip, 180.0 - front_deg, 1.1 * len);
    let front_ankle = (front_knee.0, front_knee.1 + len);
    let back_knee = (hip.0, hip.1 + len);
    let back_ankle = from_down(back_knee, -(180.0 - back_deg), len);
    let shoulder = from_down(hip, 180.0 - lean_deg, 150.0);
    frame(
        ts_ms,
        &[
            (Keypoint::LeftShoulder, shoulder.0, shoulder.1),
            (Keypoint::RightShoulder, shoulder.0 + 1.0, shoulder.1),
            (Keypoint::LeftHip, hip.0, hip.1),
            (Keypoint::RightHip, hip.0, hip.1),
            (Keypoint::LeftKnee, front_knee.0, front_knee.1),
            (Keypoint::LeftAnkle, front_ankle.0, front_ankle.1),
            (Keypoint::RightKnee, back_knee.0, back_knee.1),
            (Keypoint::RightAnkle, back_ankle.0, back_ankle.1),
        ],
    )
}

/// Side-view hinge: vertical legs, torso at `hip_deg` from the thigh
pub fn deadlift(ts_ms: i64, hip_deg: f64) -> LandmarkFrame {
    let hip = (320.0, 240.0);
    let knee = (hip.0, hip.1 + 100.0);
    let ankle = (hip.0, hip.1 + 200.0);
    let shoulder = from_down(hip, hip_deg, 150.0);
    frame(ts_ms, &bilateral(shoulder, hip, knee, ankle))
}

/// Forearm plank facing +x on the left side; `hip_drop` moves the hip down (px)
pub fn plank(ts_ms: i64, hip_drop: f64, elbow_dx: f64) -> LandmarkFrame {
    frame(
        ts_ms,
        &[
            (Keypoint::LeftShoulder, 150.0, 300.0),
            (Keypoint::LeftElbow, 150.0 + elbow_dx, 380.0),
            (Keypoint::LeftWrist, 230.0, 380.0),
            (Keypoint::LeftHip, 330.0, 300.0 + hip_drop),
            (Keypoint::LeftKnee, 440.0, 300.0),
            (Keypoint::LeftAnkle, 540.0, 300.0),
        ],
    )
}

/// High push-up on the left side with an exact elbow angle
pub fn pushup(ts_ms: i64, elbow_deg: f64) -> LandmarkFrame {
    pushup_tilted(ts_ms, elbow_deg, 0.0)
}

/// Push-up with the whole body rotated by `tilt_deg` about the shoulder
pub fn pushup_tilted(ts_ms: i64, elbow_deg: f64, tilt_deg: f64) -> LandmarkFrame {
    let shoulder = (150.0, 250.0);
    let (elbow, wrist) = folded_leg(shoulder, elbow_deg, 60.0);
    let rot = |p: (f64, f64)| {
        let (s, c) = tilt_deg.to_radians().sin_cos();
        let (dx, dy) = (p.0 - shoulder.0, p.1 - shoulder.1);
        (shoulder.0 + dx * c - dy * s, shoulder.1 + dx * s + dy * c)
    };
    let hip = rot((350.0, 265.0));
    let knee = rot((450.0, 268.0));
    let ankle = rot((550.0, 270.0));
    frame(
        ts_ms,
        &[
            (Keypoint::LeftShoulder, shoulder.0, shoulder.1),
            (Keypoint::LeftElbow, elbow.0, elbow.1),
            (Keypoint::LeftWrist, wrist.0, wrist.1),
            (Keypoint::LeftHip, hip.0, hip.1),
            (Keypoint::LeftKnee, knee.0, knee.1),
            (Keypoint::LeftAnkle, ankle.0, ankle.1),
        ],
    )
}

fn bilateral(
    shoulder: (f64, f64),
    hip: (f64, f64),
    knee: (f64, f64),
    ankle: (f64, f64),
) -> Vec<(Keypoint, f64, f64)> {
    vec![
        (Keypoint::LeftShoulder, shoulder.0, shoulder.1),
        (Keypoint::RightShoulder, shoulder.0, shoulder.1),
        (Keypoint::LeftHip, hip.0, hip.1),
        (Keypoint::RightHip, hip.0, hip.1),
        (Keypoint::LeftKnee, knee.0, knee.1),
        (Keypoint::RightKnee, knee.0, knee.1),
        (Keypoint::LeftAnkle, ankle.0, ankle.1),
        (Keypoint::RightAnkle, ankle.0, ankle.1),
    ]
}
