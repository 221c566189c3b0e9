//! Third-party verification of a delivered image against the ledger.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::hash::compute_hash;
use crate::ledger::{CertificationProof, LedgerNotary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Ledger record found and the hash matches.
    Certified,
    /// Ledger record found but the hash differs.
    Modified,
    /// No record could be read.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: VerificationStatus,
    /// Hash of the candidate image.
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<CertificationProof>,
    /// Consensus timestamp of the ledger record, when certified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
    pub message: String,
}

impl VerificationResult {
    pub fn is_certified(&self) -> bool {
        self.status == VerificationStatus::Certified
    }

    fn unknown(hash: String) -> Self {
        Self {
            status: VerificationStatus::Unknown,
            hash,
            proof: None,
            captured_at: None,
            message: "Could not verify: no matching record found on-chain.".into(),
        }
    }
}

/// Re-hashes candidate images and compares them with the ledger.
///
/// Read-only: it never submits and never touches the notary's topic.
#[derive(Debug, Clone)]
pub struct VerificationService {
    notary: Arc<LedgerNotary>,
}

impl VerificationService {
    pub fn new(notary: Arc<LedgerNotary>) -> Self {
        Self { notary }
    }

    /// Check `candidate` against the record `proof` points at.
    pub async fn verify(&self, candidate: &[u8], proof: &CertificationProof) -> VerificationResult {
        self.verify_hash(&compute_hash(candidate), proof).await
    }

    /// Check an already computed digest. Transport and parse failures
    /// degrade to `Unknown`; this never errors.
    #[instrument(
        level = "info",
        skip_all,
        fields(topic_id = %proof.topic_id, sequence_number = proof.sequence_number)
    )]
    pub async fn verify_hash(&self, hash: &str, proof: &CertificationProof) -> VerificationResult {
        let hash = hash.to_ascii_lowercase();
        let entry = match self.notary.query(&proof.topic_id, proof.sequence_number).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                info!("No ledger record for proof");
                return VerificationResult::unknown(hash);
            }
            Err(e) => {
                warn!(error = %e, "Ledger lookup failed");
                return VerificationResult::unknown(hash);
            }
        };

        let on_chain = entry.record.hash.to_ascii_lowercase();
        if on_chain == hash {
            info!(status = "certified", "Verification complete");
            VerificationResult {
                status: VerificationStatus::Certified,
                message: format!(
                    "Certified: captured at {}, Hedera tx {}",
                    entry.consensus_timestamp, proof.transaction_id
                ),
                hash,
                proof: Some(proof.clone()),
                captured_at: Some(entry.consensus_timestamp),
            }
        } else {
            info!(status = "modified", "Verification complete");
            VerificationResult {
                status: VerificationStatus::Modified,
                message: format!(
                    "Image has been modified. On-chain hash: {on_chain}, current hash: {hash}"
                ),
                hash,
                proof: Some(proof.clone()),
                captured_at: None,
            }
        }
    }
}
