//! Face landmark geometry and clinical alignment scoring.
//!
//! Landmarks come from an external detector as 68 points in frame pixels.
//! This module does not detect faces; it only measures them.

pub mod alignment;
pub mod landmarks;

pub use alignment::{score_alignment, tilt_degrees, AlignmentScore, GOOD_FACE_RATIO};
pub use landmarks::{BoundingBox, Ellipse, FaceLandmarks, LandmarkRegion, Point, LANDMARK_COUNT};
