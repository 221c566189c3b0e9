//! Certify command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use glow_core::{
    CaptureAngle, CaptureInput, CapturePipeline, EncodeFormat, PipelineConfig, PipelineStep,
};
use tracing::{debug, info};

use crate::utils::{build_bundle_path, open_notary, read_input, short_hash};
use crate::OutputFormat;

pub struct CertifyArgs {
    pub image: PathBuf,
    pub clinic: String,
    pub patient: String,
    pub photographer: String,
    pub angle: Option<CaptureAngle>,
    pub procedure: Option<String>,
    pub device: Option<String>,
    pub topic: Option<String>,
    pub jpeg_quality: Option<u8>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

fn step_number(step: PipelineStep) -> Option<usize> {
    match step {
        PipelineStep::Hashing => Some(1),
        PipelineStep::Notarizing => Some(2),
        PipelineStep::Watermarking => Some(3),
        PipelineStep::Encrypting => Some(4),
        PipelineStep::Complete | PipelineStep::Error => None,
    }
}

/// Execute the certify command.
pub async fn execute(journal: Option<PathBuf>, args: CertifyArgs, quiet: bool) -> Result<()> {
    let content = read_input(&args.image, "image")?;

    let notary = open_notary(journal.as_deref())?;
    if let Some(topic) = &args.topic {
        notary.set_topic(topic.clone()).context("Invalid --topic")?;
    }
    if notary.topic().is_none() {
        bail!(
            "No topic bound. Pass --topic or set HEDERA_TOPIC_ID \
             (create one with `glow topic create`)"
        );
    }

    let output_format = match args.jpeg_quality {
        Some(quality) => EncodeFormat::Jpeg { quality },
        None => EncodeFormat::Png,
    };
    let config = PipelineConfig {
        output_format,
        ..Default::default()
    };
    let pipeline = CapturePipeline::with_config(Arc::new(notary), config);

    let mut input = CaptureInput::new(content, args.clinic, args.patient, args.photographer);
    input.capture_angle = args.angle;
    input.procedure_type = args.procedure;
    input.device_info = args.device;

    if !quiet {
        println!();
    }
    let result = pipeline
        .certify_with_progress(input, |progress| {
            debug!(step = ?progress.step, "Pipeline progress");
            if quiet {
                return;
            }
            if let Some(n) = step_number(progress.step) {
                println!("   {} {}", format!("[{n}/4]").dimmed(), progress.message);
            }
        })
        .await
        .context("Certification failed")?;

    let bundle_path = args.output.unwrap_or_else(|| build_bundle_path(&args.image));
    let bytes = match args.format {
        OutputFormat::Cbor => result.to_cbor().context("Failed to serialize bundle")?,
        OutputFormat::Json => {
            serde_json::to_vec_pretty(&result).context("Failed to serialize bundle")?
        }
    };
    std::fs::write(&bundle_path, bytes)
        .with_context(|| format!("Failed to write bundle {}", bundle_path.display()))?;

    info!(path = %bundle_path.display(), format = ?args.format, "Bundle saved");

    if !quiet {
        println!();
        println!("{}", "Photo certified.".green().bold());
        println!();
        println!("   {} {}", "Bundle saved:".dimmed(), bundle_path.display());
        println!("   {} {}", "SHA-256:".dimmed(), short_hash(&result.sha256_hash));
        println!("   {} {}", "Topic:".dimmed(), result.hedera.topic_id);
        println!("   {} {}", "Sequence:".dimmed(), result.hedera.sequence_number);
        println!("   {} {}", "Transaction:".dimmed(), result.hedera.transaction_id);
        println!("   {} {}", "Captured at:".dimmed(), result.timestamp);
        println!(
            "   {} {} bytes (AES-256-GCM)",
            "Encrypted image:".dimmed(),
            result.encrypted_image.len()
        );
    }

    Ok(())
}
