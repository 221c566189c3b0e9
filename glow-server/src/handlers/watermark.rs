//! Watermark inspection handler
//!
//! Handles POST /watermark requests: read the LSB watermark out of an
//! uploaded photo.

use axum::{
    extract::{Multipart, State},
    Json,
};
use glow_core::{watermark, WatermarkPayload};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Watermark contents with readable field names
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedWatermark {
    /// SHA-256 of the photo as captured, before watermarking
    pub hash: String,
    pub clinic_id: String,
    pub patient_id: String,
    #[schema(example = "0.0.1001")]
    pub topic_id: String,
    pub sequence_number: u64,
    /// Capture time, RFC 3339
    pub timestamp: String,
}

impl From<WatermarkPayload> for ExtractedWatermark {
    fn from(payload: WatermarkPayload) -> Self {
        Self {
            hash: payload.hash().to_string(),
            clinic_id: payload.clinic_id().to_string(),
            patient_id: payload.patient_id().to_string(),
            topic_id: payload.topic_id().to_string(),
            sequence_number: payload.hedera_seq(),
            timestamp: payload.timestamp().to_string(),
        }
    }
}

/// Response for watermark inspection
#[derive(Debug, Serialize, ToSchema)]
pub struct WatermarkResponse {
    /// Whether a well-formed watermark was found
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ExtractedWatermark>,
}

/// Extract the embedded watermark from a photo
///
/// Accepts multipart/form-data with **file** (required). Undecodable images
/// and unmarked images both report `found: false`.
#[utoipa::path(
    post,
    path = "/watermark",
    tag = "Watermark",
    request_body(content_type = "multipart/form-data", description = "Photo to inspect"),
    responses(
        (status = 200, description = "Inspection completed", body = WatermarkResponse),
        (status = 400, description = "Missing file or unsupported Content-Type"),
        (status = 413, description = "File too large")
    )
)]
pub async fn watermark_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<WatermarkResponse>, ApiError> {
    let fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.require_file()?;

    let payload = watermark::extract_from_image(&file.data);
    match &payload {
        Some(p) => tracing::info!(
            topic_id = %p.topic_id(),
            sequence_number = p.hedera_seq(),
            file_name = ?file.file_name,
            "Watermark found"
        ),
        None => tracing::info!(
            bytes = file.data.len(),
            file_name = ?file.file_name,
            "No watermark found"
        ),
    }

    Ok(Json(WatermarkResponse {
        found: payload.is_some(),
        payload: payload.map(ExtractedWatermark::from),
    }))
}
