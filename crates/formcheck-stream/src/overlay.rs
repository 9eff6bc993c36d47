//! Skeleton overlay data republished with every analysis.
//!
//! Only geometry and a colour tone are produced here; drawing is left to the
//! renderer that subscribes to the driver. Points carry both pixel and
//! frame-relative coordinates so a renderer can scale to any canvas.

use formcheck_core::{ConfidenceGate, Keypoint, Landmark, LandmarkFrame};
use formcheck_rules::{AnalysisResult, FormGrade};

use crate::config::FrameConfig;
use serde::{Deserialize, Serialize};

/// Colour family for the skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayTone {
    Good,
    Warning,
}

impl OverlayTone {
    pub fn from_grade(grade: FormGrade) -> Self {
        if grade.is_excellent() {
            OverlayTone::Good
        } else {
            OverlayTone::Warning
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            OverlayTone::Good => "#00BCD4",
            OverlayTone::Warning => "#FF9800",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPoint {
    pub keypoint: Keypoint,
    pub x: f64,
    pub y: f64,
    /// `x` as a fraction of the frame width
    pub u: f64,
    /// `y` as a fraction of the frame height
    pub v: f64,
    pub confidence: f32,
}

impl OverlayPoint {
    fn new(keypoint: Keypoint, landmark: &Landmark, frame: &FrameConfig) -> Self {
        Self {
            keypoint,
            x: landmark.x,
            y: landmark.y,
            u: landmark.x / frame.width,
            v: landmark.y / frame.height,
            confidence: landmark.confidence,
        }
    }
}

/// A bone between two drawable points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlaySegment {
    pub from: OverlayPoint,
    pub to: OverlayPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayFrame {
    pub points: Vec<OverlayPoint>,
    pub segments: Vec<OverlaySegment>,
    pub tone: OverlayTone,
}

impl OverlayFrame {
    /// Builds the overlay from a smoothed frame.
    ///
    /// A joint is drawn only when it passes the standard gate, and a bone only
    /// when both of its ends are drawn.
    pub fn build(smoothed: &LandmarkFrame, tone: OverlayTone, frame: &FrameConfig) -> Self {
        let gate = ConfidenceGate::STANDARD;

        let points = Keypoint::ALL
            .iter()
            .filter_map(|&kp| {
                smoothed
                    .usable(kp, &gate)
                    .map(|lm| OverlayPoint::new(kp, &lm, frame))
            })
            .collect();

        let segments = Keypoint::skeleton_pairs()
            .iter()
            .filter_map(|&(a, b)| {
                let from = smoothed.usable(a, &gate)?;
                let to = smoothed.usable(b, &gate)?;
                Some(OverlaySegment {
                    from: OverlayPoint::new(a, &from, frame),
                    to: OverlayPoint::new(b, &to, frame),
                })
            })
            .collect();

        Self {
            points,
            segments,
            tone,
        }
    }

    pub fn for_analysis(
        smoothed: &LandmarkFrame,
        analysis: &AnalysisResult,
        frame: &FrameConfig,
    ) -> Self {
        Self::build(smoothed, OverlayTone::from_grade(analysis.overall_form), frame)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formcheck_core::Timestamp;

    fn frame() -> LandmarkFrame {
        LandmarkFrame::empty(Timestamp::from_millis(0))
            .with_landmark(Keypoint::LeftShoulder, Landmark::new(300.0, 100.0, 0.9))
            .with_landmark(Keypoint::LeftElbow, Landmark::new(310.0, 160.0, 0.9))
            .with_landmark(Keypoint::LeftWrist, Landmark::new(320.0, 220.0, 0.5))
            .with_landmark(Keypoint::LeftHip, Landmark::new(300.0, 240.0, 0.8))
    }

    #[test]
    fn test_gated_points_and_segments() {
        let overlay = OverlayFrame::build(&frame(), OverlayTone::Good, &FrameConfig::default());

        // wrist at exactly 0.5 fails the strict gate
        assert_eq!(overlay.points.len(), 3);
        assert!(overlay
            .points
            .iter()
            .all(|p| p.keypoint != Keypoint::LeftWrist));

        let has = |a: Keypoint, b: Keypoint| {
            overlay
                .segments
                .iter()
                .any(|s| s.from.keypoint == a && s.to.keypoint == b)
        };
        assert!(has(Keypoint::LeftShoulder, Keypoint::LeftElbow));
        assert!(has(Keypoint::LeftShoulder, Keypoint::LeftHip));
        assert!(!has(Keypoint::LeftElbow, Keypoint::LeftWrist));
    }

    #[test]
    fn test_points_normalised_to_frame() {
        let frame_size = FrameConfig {
            width: 600.0,
            height: 400.0,
        };
        let overlay = OverlayFrame::build(&frame(), OverlayTone::Good, &frame_size);
        for p in &overlay.points {
            assert!((p.u - p.x / 600.0).abs() < 1e-12);
            assert!((p.v - p.y / 400.0).abs() < 1e-12);
        }
        let hip = overlay
            .points
            .iter()
            .find(|p| p.keypoint == Keypoint::LeftHip)
            .unwrap();
        assert!((hip.u - 0.5).abs() < 1e-12);
        assert!((hip.v - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_tone_from_grade() {
        assert_eq!(OverlayTone::from_grade(FormGrade::Excellent), OverlayTone::Good);
        assert_eq!(
            OverlayTone::from_grade(FormGrade::NeedsImprovement),
            OverlayTone::Warning
        );
        assert_eq!(OverlayTone::from_grade(FormGrade::Poor).hex(), "#FF9800");
    }

    #[test]
    fn test_empty_frame() {
        let overlay = OverlayFrame::build(
            &LandmarkFrame::empty(Timestamp::from_millis(0)),
            OverlayTone::Warning,
            &FrameConfig::default(),
        );
        assert!(overlay.is_empty());
        assert!(overlay.segments.is_empty());
    }
}
