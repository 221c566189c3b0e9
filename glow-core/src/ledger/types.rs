//! Ledger wire records.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{GlowError, Result};

/// Current notarization record schema version.
pub const RECORD_VERSION: u32 = 1;

/// Where and when a hash was anchored. Immutable once the ledger returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CertificationProof {
    pub transaction_id: String,
    pub consensus_timestamp: String,
    pub topic_id: String,
    pub sequence_number: u64,
}

/// Record appended to a clinic topic for each certified capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotarizationRecord {
    #[serde(rename = "v")]
    pub version: u32,
    pub hash: String,
    #[serde(rename = "cid")]
    pub clinic_id: String,
    #[serde(rename = "pid")]
    pub patient_id: String,
    #[serde(rename = "uid")]
    pub photographer_id: String,
    #[serde(rename = "angle", default, skip_serializing_if = "Option::is_none")]
    pub capture_angle: Option<String>,
    #[serde(rename = "proc", default, skip_serializing_if = "Option::is_none")]
    pub procedure_type: Option<String>,
    #[serde(rename = "dev", default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    #[serde(rename = "ts")]
    pub timestamp: String,
}

impl NotarizationRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| GlowError::Serialization(format!("Ledger record: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| GlowError::Serialization(format!("Malformed ledger record: {e}")))
    }
}

/// What a topic append returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub transaction_id: String,
    pub consensus_timestamp: String,
    pub sequence_number: u64,
}

/// A topic message as served by a mirror node. `message` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorMessage {
    pub consensus_timestamp: String,
    pub topic_id: String,
    pub sequence_number: u64,
    pub message: String,
}

impl MirrorMessage {
    /// Decode the base64 body into a notarization record.
    pub fn decode_record(&self) -> Result<NotarizationRecord> {
        let bytes = BASE64
            .decode(self.message.trim())
            .map_err(|e| GlowError::Serialization(format!("Mirror message is not base64: {e}")))?;
        NotarizationRecord::from_bytes(&bytes)
    }
}

/// A decoded ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub record: NotarizationRecord,
    pub consensus_timestamp: String,
    pub topic_id: String,
    pub sequence_number: u64,
}

impl TryFrom<MirrorMessage> for LedgerEntry {
    type Error = GlowError;

    fn try_from(message: MirrorMessage) -> Result<Self> {
        let record = message.decode_record()?;
        Ok(Self {
            record,
            consensus_timestamp: message.consensus_timestamp,
            topic_id: message.topic_id,
            sequence_number: message.sequence_number,
        })
    }
}
