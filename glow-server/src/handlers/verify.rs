//! Verification handler
//!
//! Handles POST /verify requests: re-hash an uploaded photo and compare it
//! with the ledger record the caller claims for it.

use axum::{
    extract::{Multipart, State},
    Json,
};
use glow_core::{CertificationProof, VerificationResult, VerificationStatus};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::{parse_sequence_number, validate_topic_id};

/// Ledger coordinates of a notarization record
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    #[schema(example = "0.0.4242@1718000000.000000001")]
    pub transaction_id: String,
    #[schema(example = "1718000000.000000001")]
    pub consensus_timestamp: String,
    #[schema(example = "0.0.1001")]
    pub topic_id: String,
    #[schema(example = 1)]
    pub sequence_number: u64,
}

impl From<CertificationProof> for ProofResponse {
    fn from(proof: CertificationProof) -> Self {
        Self {
            transaction_id: proof.transaction_id,
            consensus_timestamp: proof.consensus_timestamp,
            topic_id: proof.topic_id,
            sequence_number: proof.sequence_number,
        }
    }
}

/// Response for verification
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// `certified`, `modified` or `unknown`
    #[schema(value_type = String, example = "certified")]
    pub status: VerificationStatus,
    /// SHA-256 of the uploaded bytes, lowercase hex
    pub hash: String,
    /// Present when a ledger record was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofResponse>,
    /// Consensus timestamp of the record, when certified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
    /// Human-readable verdict
    pub message: String,
}

impl From<VerificationResult> for VerifyResponse {
    fn from(result: VerificationResult) -> Self {
        Self {
            status: result.status,
            hash: result.hash,
            proof: result.proof.map(ProofResponse::from),
            captured_at: result.captured_at,
            message: result.message,
        }
    }
}

/// Verify a photo against its ledger record
///
/// Accepts multipart/form-data with:
/// - **file** (required): The photo bytes exactly as delivered
/// - **topic_id** (required): Clinic topic, e.g. `0.0.1001`
/// - **sequence_number** (required): Record sequence within the topic
/// - **transaction_id**, **consensus_timestamp** (optional): Echoed from the proof
///
/// A missing record or an unreachable ledger yields `unknown`, never an error.
#[utoipa::path(
    post,
    path = "/verify",
    tag = "Verification",
    request_body(
        content_type = "multipart/form-data",
        description = "Photo and the ledger coordinates claimed for it"
    ),
    responses(
        (status = 200, description = "Verification completed", body = VerifyResponse),
        (status = 400, description = "Invalid request (missing file, bad topic id, etc.)"),
        (status = 413, description = "File too large")
    )
)]
pub async fn verify_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VerifyResponse>, ApiError> {
    let fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;

    let file = fields.require_file()?;
    let topic_id = validate_topic_id(fields.require_text("topic_id")?)?;
    let sequence_number = parse_sequence_number(fields.require_text("sequence_number")?)?;

    let proof = CertificationProof {
        transaction_id: fields
            .get_text("transaction_id")
            .unwrap_or("unknown")
            .to_string(),
        consensus_timestamp: fields
            .get_text("consensus_timestamp")
            .unwrap_or_default()
            .to_string(),
        topic_id,
        sequence_number,
    };

    tracing::debug!(
        bytes = file.data.len(),
        file_name = ?file.file_name,
        topic_id = %proof.topic_id,
        sequence_number,
        "Verifying upload"
    );

    let result = state.verifier.verify(&file.data, &proof).await;

    tracing::info!(status = ?result.status, hash = %result.hash, "Verification completed");

    Ok(Json(result.into()))
}
