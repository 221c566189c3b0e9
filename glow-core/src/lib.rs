//! Glow Core - certified clinical photography
//!
//! This crate turns a raw capture into a tamper-evident artifact and lets
//! anyone check a delivered image against the public record later.
//!
//! # Features
//!
//! - SHA-256 content hashing of the image as captured
//! - Notarization on a Hedera Consensus Service topic, read back through
//!   the mirror node
//! - Steganographic watermark carrying the hash and ledger position
//! - AES-256-GCM encryption of the watermarked image
//! - Challenge-response liveness gate to keep replayed captures out
//! - Clinical capture angles, photo series and alignment scoring
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use glow_core::{
//!     CaptureInput, CapturePipeline, LedgerNotary, MemoryConsensusLog, VerificationService,
//! };
//!
//! # async fn example(image: Vec<u8>) -> glow_core::Result<()> {
//! // Local in-process ledger; use LedgerNotary::initialize for Hedera
//! let notary = Arc::new(LedgerNotary::new(Arc::new(MemoryConsensusLog::new())));
//! notary.create_topic(Some("Clinic A")).await?;
//!
//! let pipeline = CapturePipeline::new(notary.clone());
//! let input = CaptureInput::new(image.clone(), "clinic-a", "patient-42", "dr-lee");
//! let certified = pipeline.certify(input).await?;
//!
//! // Later, anyone holding the original bytes and the proof can check them
//! let verifier = VerificationService::new(notary);
//! let result = verifier.verify(&image, &certified.hedera).await;
//! assert!(result.is_certified());
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod codec;
pub mod error;
pub mod face;
pub mod hash;
pub mod ledger;
pub mod liveness;
pub mod pipeline;
pub mod vault;
pub mod verify;
pub mod watermark;

// Re-export main types for convenience
pub use capture::{CaptureAngle, PhotoSeries};
pub use codec::{DecodedImage, EncodeFormat};
pub use error::{GlowError, Result};
pub use hash::{compute_hash, verify_hash};
pub use ledger::{
    CertificationProof, ConsensusLog, HederaConfig, LedgerEntry, LedgerNotary,
    MemoryConsensusLog, NotarizationRecord,
};
pub use liveness::{
    LivenessChallenge, LivenessConfig, LivenessDetector, LivenessFrame, LivenessGate,
    LivenessPass, LivenessState,
};
pub use pipeline::{
    CaptureInput, CapturePipeline, CertificationResult, PipelineConfig, PipelineProgress,
    PipelineStep,
};
pub use vault::EncryptionKey;
pub use verify::{VerificationResult, VerificationService, VerificationStatus};
pub use watermark::{SpreadSpectrumCodec, WatermarkPayload};

#[cfg(feature = "network")]
pub use ledger::HederaConsensusLog;
