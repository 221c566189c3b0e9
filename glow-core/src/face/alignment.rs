//! Clinical photography alignment scoring.
//!
//! Scores a frame against standard clinical framing: eyes level, face
//! centred, and the face filling 15-35% of the frame. Before/after photos
//! are only comparable when both score well.

use serde::{Deserialize, Serialize};

use super::landmarks::FaceLandmarks;
use crate::error::{GlowError, Result};

const LEFT_EYE_OUTER: usize = 36;
const RIGHT_EYE_OUTER: usize = 45;
const NOSE_TIP: usize = 30;

/// Face-to-frame area range considered well framed, percent.
pub const GOOD_FACE_RATIO: std::ops::RangeInclusive<u32> = 15..=35;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentScore {
    /// 0-100.
    pub overall: u32,
    /// Head roll in degrees; 0 is level.
    pub tilt: f64,
    /// 0-100; 100 is perfectly centred.
    pub centering: u32,
    /// Percent of the frame covered by the face bounding box.
    pub face_ratio: u32,
    pub feedback: String,
}

impl AlignmentScore {
    pub fn is_ready(&self) -> bool {
        self.overall >= 80
    }
}

/// Roll angle of the line through the outer eye corners, degrees.
pub fn tilt_degrees(landmarks: &FaceLandmarks) -> f64 {
    let left = landmarks.point(LEFT_EYE_OUTER);
    let right = landmarks.point(RIGHT_EYE_OUTER);
    (right.y - left.y).atan2(right.x - left.x).to_degrees().abs()
}

fn centering(landmarks: &FaceLandmarks, width: f64, height: f64) -> u32 {
    let nose = landmarks.point(NOSE_TIP);
    let dx = (nose.x - width / 2.0).abs() / width;
    let dy = (nose.y - height / 2.0).abs() / height;
    (100.0 - dx.hypot(dy) * 300.0).round().max(0.0) as u32
}

fn face_ratio(landmarks: &FaceLandmarks, width: f64, height: f64) -> u32 {
    (landmarks.bounding_box().area() / (width * height) * 100.0)
        .round()
        .max(0.0) as u32
}

fn ratio_score(ratio: u32) -> f64 {
    if GOOD_FACE_RATIO.contains(&ratio) {
        100.0
    } else if ratio < *GOOD_FACE_RATIO.start() {
        (ratio as f64 / 15.0 * 100.0).round()
    } else {
        (100.0 - (ratio as f64 - 35.0) * 3.0).max(0.0)
    }
}

/// Score landmark alignment within a `frame_width` x `frame_height` frame.
pub fn score_alignment(
    landmarks: &FaceLandmarks,
    frame_width: f64,
    frame_height: f64,
) -> Result<AlignmentScore> {
    if !(frame_width > 0.0 && frame_height > 0.0) {
        return Err(GlowError::InvalidConfig(format!(
            "Frame size must be positive, got {frame_width}x{frame_height}"
        )));
    }

    let tilt = tilt_degrees(landmarks);
    let centering = centering(landmarks, frame_width, frame_height);
    let face_ratio = face_ratio(landmarks, frame_width, frame_height);

    let tilt_score = (100.0 - tilt * 15.0).max(0.0);
    let overall =
        (tilt_score * 0.4 + centering as f64 * 0.3 + ratio_score(face_ratio) * 0.3).round() as u32;

    let feedback = if tilt > 5.0 {
        "Tilt head to level position"
    } else if centering < 50 {
        "Center face in frame"
    } else if face_ratio < 10 {
        "Move closer"
    } else if face_ratio > 40 {
        "Move further away"
    } else if overall >= 80 {
        "Good alignment, ready to capture"
    } else {
        "Adjust position for better alignment"
    };

    Ok(AlignmentScore {
        overall,
        tilt,
        centering,
        face_ratio,
        feedback: feedback.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::landmarks::tests::synthetic_face;
    use crate::face::landmarks::Point;

    fn rotated(face: &FaceLandmarks, degrees: f64) -> FaceLandmarks {
        let (s, c) = degrees.to_radians().sin_cos();
        let pivot = face.point(NOSE_TIP);
        let points = face
            .positions()
            .iter()
            .map(|p| {
                let (x, y) = (p.x - pivot.x, p.y - pivot.y);
                Point::new(pivot.x + x * c - y * s, pivot.y + x * s + y * c)
            })
            .collect();
        FaceLandmarks::new(points).unwrap()
    }

    #[test]
    fn test_centered_level_face_is_ready() {
        // Face bbox 280x224 in a 640x480 frame: about 20% coverage.
        let face = synthetic_face(320.0, 240.0, 140.0);
        let score = score_alignment(&face, 640.0, 480.0).unwrap();
        assert!(score.tilt < 1e-9);
        assert_eq!(score.centering, 100);
        assert!(GOOD_FACE_RATIO.contains(&score.face_ratio), "ratio {}", score.face_ratio);
        assert_eq!(score.overall, 100);
        assert!(score.is_ready());
        assert_eq!(score.feedback, "Good alignment, ready to capture");
    }

    #[test]
    fn test_tilt_detected() {
        let face = rotated(&synthetic_face(320.0, 240.0, 100.0), 8.0);
        let score = score_alignment(&face, 640.0, 480.0).unwrap();
        assert!((score.tilt - 8.0).abs() < 1e-6);
        assert_eq!(score.feedback, "Tilt head to level position");
    }

    #[test]
    fn test_off_center() {
        let face = synthetic_face(80.0, 60.0, 40.0);
        let score = score_alignment(&face, 640.0, 480.0).unwrap();
        assert!(score.centering < 50);
        assert_eq!(score.feedback, "Center face in frame");
    }

    #[test]
    fn test_distance_feedback() {
        let small = score_alignment(&synthetic_face(320.0, 240.0, 30.0), 640.0, 480.0).unwrap();
        assert_eq!(small.feedback, "Move closer");

        let large = score_alignment(&synthetic_face(320.0, 240.0, 260.0), 640.0, 480.0).unwrap();
        assert_eq!(large.feedback, "Move further away");
    }

    #[test]
    fn test_ratio_score_curve() {
        assert_eq!(ratio_score(25), 100.0);
        assert_eq!(ratio_score(0), 0.0);
        assert_eq!(ratio_score(45), 70.0);
        assert_eq!(ratio_score(100), 0.0);
    }

    #[test]
    fn test_rejects_empty_frame() {
        let face = synthetic_face(10.0, 10.0, 5.0);
        assert!(score_alignment(&face, 0.0, 480.0).is_err());
    }
}
