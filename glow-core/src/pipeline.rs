//! Certified capture pipeline: hash, notarize, watermark, encrypt.
//!
//! Each phase feeds the next and any failure aborts the run, so a
//! [`CertificationResult`] only ever exists for a capture that went through
//! all four. The hash always covers the bytes as captured; the watermark is
//! only embedded once the ledger has returned a proof; encryption seals the
//! watermarked image.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::capture::CaptureAngle;
use crate::codec::{self, EncodeFormat};
use crate::error::{GlowError, Result};
use crate::hash::compute_hash;
use crate::ledger::{CertificationProof, LedgerNotary, NotarizationRecord, RECORD_VERSION};
use crate::liveness::LivenessPass;
use crate::vault::{self, EncryptionKey};
use crate::watermark::{self, WatermarkPayload};

/// A raw capture with the metadata that goes on the ledger.
#[derive(Debug, Clone)]
pub struct CaptureInput {
    /// Compressed image bytes exactly as captured.
    pub image: Vec<u8>,
    pub clinic_id: String,
    pub patient_id: String,
    pub photographer_id: String,
    pub capture_angle: Option<CaptureAngle>,
    pub procedure_type: Option<String>,
    pub device_info: Option<String>,
    pub liveness: Option<LivenessPass>,
}

impl CaptureInput {
    pub fn new(
        image: Vec<u8>,
        clinic_id: impl Into<String>,
        patient_id: impl Into<String>,
        photographer_id: impl Into<String>,
    ) -> Self {
        Self {
            image,
            clinic_id: clinic_id.into(),
            patient_id: patient_id.into(),
            photographer_id: photographer_id.into(),
            capture_angle: None,
            procedure_type: None,
            device_info: None,
            liveness: None,
        }
    }

    /// Build from base64 or data-URL transport text.
    pub fn from_base64(
        text: &str,
        clinic_id: impl Into<String>,
        patient_id: impl Into<String>,
        photographer_id: impl Into<String>,
    ) -> Result<Self> {
        let image = codec::base64_to_bytes(text)?;
        Ok(Self::new(image, clinic_id, patient_id, photographer_id))
    }

    pub fn with_angle(mut self, angle: CaptureAngle) -> Self {
        self.capture_angle = Some(angle);
        self
    }

    pub fn with_procedure(mut self, procedure_type: impl Into<String>) -> Self {
        self.procedure_type = Some(procedure_type.into());
        self
    }

    pub fn with_device(mut self, device_info: impl Into<String>) -> Self {
        self.device_info = Some(device_info.into());
        self
    }

    pub fn with_liveness(mut self, pass: LivenessPass) -> Self {
        self.liveness = Some(pass);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Container for the watermarked image. PNG keeps every bit; JPEG is
    /// accepted at quality 90 or above and only if the watermark reads back.
    pub output_format: EncodeFormat,
    /// Refuse captures that carry no [`LivenessPass`].
    pub require_liveness: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_format: EncodeFormat::Png,
            require_liveness: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Hashing,
    Notarizing,
    Watermarking,
    Encrypting,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    pub step: PipelineStep,
    pub message: String,
}

impl PipelineProgress {
    fn new(step: PipelineStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

/// Everything needed to store a certified capture in an evidence vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationResult {
    /// SHA-256 of the image as captured.
    pub sha256_hash: String,
    pub hedera: CertificationProof,
    pub watermark_data: WatermarkPayload,
    /// `nonce || ciphertext` of the watermarked image.
    #[serde(with = "crate::vault::bytes_serde")]
    pub encrypted_image: Vec<u8>,
    pub encryption_key: EncryptionKey,
    pub timestamp: String,
}

impl CertificationResult {
    /// Recover the watermarked image.
    pub fn decrypt_image(&self) -> Result<Vec<u8>> {
        vault::decrypt(&self.encrypted_image, &self.encryption_key)
    }

    /// Serialize to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| GlowError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| GlowError::Serialization(e.to_string()))
    }
}

/// Runs captures through hash, notarize, watermark and encrypt.
///
/// Cheap to clone; clones share the notary.
#[derive(Debug, Clone)]
pub struct CapturePipeline {
    notary: Arc<LedgerNotary>,
    config: PipelineConfig,
}

impl CapturePipeline {
    pub fn new(notary: Arc<LedgerNotary>) -> Self {
        Self::with_config(notary, PipelineConfig::default())
    }

    pub fn with_config(notary: Arc<LedgerNotary>, config: PipelineConfig) -> Self {
        Self { notary, config }
    }

    pub fn notary(&self) -> &LedgerNotary {
        &self.notary
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn certify(&self, input: CaptureInput) -> Result<CertificationResult> {
        self.certify_with_progress(input, |_| {}).await
    }

    /// Certify one capture, reporting each phase to `on_progress`.
    ///
    /// Steps arrive in order and end with exactly one `Complete` or `Error`.
    pub async fn certify_with_progress<F>(
        &self,
        input: CaptureInput,
        mut on_progress: F,
    ) -> Result<CertificationResult>
    where
        F: FnMut(PipelineProgress) + Send,
    {
        let result = self.run(&input, &mut on_progress).await;
        match &result {
            Ok(_) => on_progress(PipelineProgress::new(PipelineStep::Complete, "Photo certified.")),
            Err(e) => {
                warn!(error = %e, "Certification failed");
                on_progress(PipelineProgress::new(PipelineStep::Error, e.to_string()));
            }
        }
        result
    }

    /// Certify several captures concurrently, one task each. Results keep
    /// input order and one failure does not cancel the others.
    #[instrument(level = "info", skip_all, fields(count = inputs.len()))]
    pub async fn certify_series(
        &self,
        inputs: Vec<CaptureInput>,
    ) -> Vec<Result<CertificationResult>> {
        let handles: Vec<_> = inputs
            .into_iter()
            .map(|input| {
                let pipeline = self.clone();
                tokio::spawn(async move { pipeline.certify(input).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(
                handle
                    .await
                    .unwrap_or_else(|e| Err(GlowError::CaptureTask(e.to_string()))),
            );
        }
        let certified = results.iter().filter(|r| r.is_ok()).count();
        info!(certified, failed = results.len() - certified, "Series finished");
        results
    }

    #[instrument(
        level = "info",
        skip_all,
        fields(clinic_id = %input.clinic_id, angle = ?input.capture_angle)
    )]
    async fn run<F>(&self, input: &CaptureInput, on_progress: &mut F) -> Result<CertificationResult>
    where
        F: FnMut(PipelineProgress) + Send,
    {
        if self.config.require_liveness && input.liveness.is_none() {
            return Err(GlowError::LivenessFailed(
                "Capture requires a passed liveness check".into(),
            ));
        }
        let format = self.config.output_format;
        format.ensure_watermark_safe()?;

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        on_progress(PipelineProgress::new(PipelineStep::Hashing, "Computing SHA-256 hash..."));
        let sha256_hash = compute_hash(&input.image);
        // Decode before anything reaches the ledger so unreadable captures
        // never leave an orphan record.
        let decoded = codec::decode(&input.image)?;
        debug!(
            hash = %sha256_hash,
            width = decoded.width,
            height = decoded.height,
            "Hashed capture"
        );

        on_progress(PipelineProgress::new(
            PipelineStep::Notarizing,
            "Anchoring to Hedera blockchain...",
        ));
        let topic_id = match self.notary.topic() {
            Some(topic_id) if self.notary.is_ready() => topic_id,
            _ => {
                return Err(GlowError::LedgerUnavailable(
                    "Ledger notary not initialized. Bind a topic before certifying.".into(),
                ))
            }
        };
        // The ledger record is permanent, so the watermark must be known to
        // fit before it is written.
        ensure_watermark_fits(&decoded, &sha256_hash, input, topic_id, &timestamp)?;
        let record = NotarizationRecord {
            version: RECORD_VERSION,
            hash: sha256_hash.clone(),
            clinic_id: input.clinic_id.clone(),
            patient_id: input.patient_id.clone(),
            photographer_id: input.photographer_id.clone(),
            capture_angle: input.capture_angle.map(|a| a.to_string()),
            procedure_type: input.procedure_type.clone(),
            device_info: input.device_info.clone(),
            timestamp: timestamp.clone(),
        };
        let hedera = self.notary.submit(&record).await?;

        on_progress(PipelineProgress::new(
            PipelineStep::Watermarking,
            "Embedding steganographic watermark...",
        ));
        let watermark_data = WatermarkPayload::new(
            sha256_hash.clone(),
            input.clinic_id.clone(),
            input.patient_id.clone(),
            &hedera,
            timestamp.clone(),
        );
        let marked_pixels = watermark::embed(&decoded.pixels, &watermark_data)?;
        let marked = codec::encode(&marked_pixels, decoded.width, decoded.height, format)?;
        if watermark::extract_from_image(&marked).as_ref() != Some(&watermark_data) {
            return Err(GlowError::WatermarkLost(format!(
                "Watermark unreadable after encoding as {}",
                format.mime_type()
            )));
        }

        on_progress(PipelineProgress::new(
            PipelineStep::Encrypting,
            "Encrypting with AES-256-GCM...",
        ));
        let encryption_key = vault::generate_key();
        let encrypted_image = vault::encrypt(&marked, &encryption_key)?;

        info!(
            hash = %sha256_hash,
            topic_id = %hedera.topic_id,
            sequence_number = hedera.sequence_number,
            "Capture certified"
        );

        Ok(CertificationResult {
            sha256_hash,
            hedera,
            watermark_data,
            encrypted_image,
            encryption_key,
            timestamp,
        })
    }
}

/// Fail with `WatermarkCapacity` unless the payload for this capture fits
/// whatever sequence number the ledger assigns.
fn ensure_watermark_fits(
    decoded: &codec::DecodedImage,
    hash: &str,
    input: &CaptureInput,
    topic_id: &str,
    timestamp: &str,
) -> Result<()> {
    let json_len = WatermarkPayload::max_json_len(
        hash,
        &input.clinic_id,
        &input.patient_id,
        topic_id,
        timestamp,
    )?;
    if json_len > watermark::MAX_PAYLOAD_LEN {
        return Err(GlowError::Serialization(format!(
            "Watermark payload is {json_len} bytes, limit is {}",
            watermark::MAX_PAYLOAD_LEN
        )));
    }

    let needed = watermark::pixels_for_json_len(json_len);
    let available = decoded.pixel_count();
    if needed > available {
        return Err(GlowError::WatermarkCapacity { needed, available });
    }
    Ok(())
}
