//! Face alignment handler
//!
//! Handles POST /alignment requests: score 68-point landmarks against
//! clinical framing so capture clients can guide the photographer.

use axum::{extract::rejection::JsonRejection, Json};
use glow_core::face::{score_alignment, AlignmentScore, FaceLandmarks, Point};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;

/// Landmarks for one frame
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentRequest {
    /// Exactly 68 `{x, y}` points in frame pixels
    #[schema(value_type = Vec<Object>)]
    pub landmarks: Vec<Point>,
    #[schema(example = 1280.0)]
    pub frame_width: f64,
    #[schema(example = 720.0)]
    pub frame_height: f64,
}

/// Alignment score for one frame
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentResponse {
    /// 0-100
    #[schema(example = 92)]
    pub overall: u32,
    /// Head roll in degrees
    pub tilt: f64,
    /// 0-100
    pub centering: u32,
    /// Face bounding box as a percent of the frame
    pub face_ratio: u32,
    #[schema(example = "Good alignment, ready to capture")]
    pub feedback: String,
    /// Whether the frame is good enough to capture
    pub ready: bool,
}

impl From<AlignmentScore> for AlignmentResponse {
    fn from(score: AlignmentScore) -> Self {
        Self {
            ready: score.is_ready(),
            overall: score.overall,
            tilt: score.tilt,
            centering: score.centering,
            face_ratio: score.face_ratio,
            feedback: score.feedback,
        }
    }
}

/// Score face alignment
///
/// Scores head tilt, centering and face-to-frame ratio for standard clinical
/// framing. Returns 400 for a landmark count other than 68 or a
/// non-positive frame size.
#[utoipa::path(
    post,
    path = "/alignment",
    tag = "Capture",
    request_body = AlignmentRequest,
    responses(
        (status = 200, description = "Alignment scored", body = AlignmentResponse),
        (status = 400, description = "Malformed landmarks or frame size")
    )
)]
pub async fn alignment_handler(
    payload: Result<Json<AlignmentRequest>, JsonRejection>,
) -> Result<Json<AlignmentResponse>, ApiError> {
    let Json(request) = payload
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))?;

    let landmarks = FaceLandmarks::new(request.landmarks)?;
    let score = score_alignment(&landmarks, request.frame_width, request.frame_height)?;

    tracing::debug!(overall = score.overall, tilt = score.tilt, "Alignment scored");

    Ok(Json(score.into()))
}
