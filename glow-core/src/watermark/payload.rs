//! Watermark payload record.

use serde::{Deserialize, Serialize};

use crate::error::{GlowError, Result};
use crate::ledger::CertificationProof;

/// Metadata hidden in a certified image.
///
/// Serialized with single-letter keys to keep the embedded message small.
/// The ledger fields always come from a proof that already exists: fields
/// are private and [`WatermarkPayload::new`] is the only constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatermarkPayload {
    #[serde(rename = "h")]
    hash: String,
    #[serde(rename = "c")]
    clinic_id: String,
    #[serde(rename = "p")]
    patient_id: String,
    #[serde(rename = "tid")]
    topic_id: String,
    #[serde(rename = "s")]
    hedera_seq: u64,
    #[serde(rename = "t")]
    timestamp: String,
}

/// Borrowed view with the same wire keys, used to size a payload before
/// any proof exists.
#[derive(Serialize)]
struct WireShape<'a> {
    h: &'a str,
    c: &'a str,
    p: &'a str,
    tid: &'a str,
    s: u64,
    t: &'a str,
}

impl WatermarkPayload {
    pub fn new(
        hash: impl Into<String>,
        clinic_id: impl Into<String>,
        patient_id: impl Into<String>,
        proof: &CertificationProof,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            hash: hash.into(),
            clinic_id: clinic_id.into(),
            patient_id: patient_id.into(),
            topic_id: proof.topic_id.clone(),
            hedera_seq: proof.sequence_number,
            timestamp: timestamp.into(),
        }
    }

    /// SHA-256 of the bytes as captured, before watermarking.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn clinic_id(&self) -> &str {
        &self.clinic_id
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    /// Sequence number the ledger assigned to the notarization record.
    pub fn hedera_seq(&self) -> u64 {
        self.hedera_seq
    }

    /// Capture time, RFC 3339.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Compact JSON bytes, as embedded.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| GlowError::Serialization(format!("Watermark payload: {e}")))
    }

    /// Parse embedded JSON. Malformed or unexpected shapes yield `None`.
    pub fn from_json(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    /// Largest JSON length a payload with these fields can have once the
    /// ledger assigns a sequence number on `topic_id`.
    pub fn max_json_len(
        hash: &str,
        clinic_id: &str,
        patient_id: &str,
        topic_id: &str,
        timestamp: &str,
    ) -> Result<usize> {
        let shape = WireShape {
            h: hash,
            c: clinic_id,
            p: patient_id,
            tid: topic_id,
            s: u64::MAX,
            t: timestamp,
        };
        serde_json::to_vec(&shape)
            .map(|json| json.len())
            .map_err(|e| GlowError::Serialization(format!("Watermark payload: {e}")))
    }

    /// Whether this payload points at the given ledger entry.
    pub fn matches_proof(&self, proof: &CertificationProof) -> bool {
        self.topic_id == proof.topic_id && self.hedera_seq == proof.sequence_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof() -> CertificationProof {
        CertificationProof {
            transaction_id: "0.0.1001@1700000000.000000001".into(),
            consensus_timestamp: "1700000000.000000001".into(),
            topic_id: "0.0.4242".into(),
            sequence_number: 7,
        }
    }

    #[test]
    fn test_new_copies_proof_fields() {
        let timestamp = "2026-01-01T00:00:00.000Z";
        let payload = WatermarkPayload::new("ab12", "clinic", "patient", &proof(), timestamp);
        assert_eq!(payload.topic_id(), "0.0.4242");
        assert_eq!(payload.hedera_seq(), 7);
        assert_eq!(payload.clinic_id(), "clinic");
        assert!(payload.matches_proof(&proof()));
    }

    #[test]
    fn test_short_keys() {
        let payload = WatermarkPayload::new("ab12", "c1", "p1", &proof(), "t");
        let json = String::from_utf8(payload.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"h":"ab12","c":"c1","p":"p1","tid":"0.0.4242","s":7,"t":"t"}"#
        );
        assert_eq!(WatermarkPayload::from_json(json.as_bytes()), Some(payload));
    }

    #[test]
    fn test_rejects_unknown_or_missing_keys() {
        let extra = br#"{"h":"a","c":"c","p":"p","tid":"t","s":1,"t":"t","x":0}"#;
        assert!(WatermarkPayload::from_json(extra).is_none());
        assert!(WatermarkPayload::from_json(br#"{"h":"a"}"#).is_none());
        assert!(WatermarkPayload::from_json(b"not json").is_none());
    }

    #[test]
    fn test_max_json_len_bounds_any_sequence() {
        let max = WatermarkPayload::max_json_len("ab12", "c\"1", "p1", "0.0.4242", "t").unwrap();
        let mut widest = proof();
        widest.sequence_number = u64::MAX;
        let payload = WatermarkPayload::new("ab12", "c\"1", "p1", &widest, "t");
        assert_eq!(payload.to_json().unwrap().len(), max);

        let actual = WatermarkPayload::new("ab12", "c\"1", "p1", &proof(), "t");
        assert!(actual.to_json().unwrap().len() < max);
    }
}
