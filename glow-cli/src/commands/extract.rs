//! Extract command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use glow_core::codec;
use glow_core::watermark::{self, SpreadSpectrumCodec};
use tracing::{debug, info};

use crate::utils::{read_input, short_hash};

/// Execute the extract command.
pub fn execute(
    image: PathBuf,
    spread_hash: Option<String>,
    redundancy: usize,
    quiet: bool,
) -> Result<()> {
    let content = read_input(&image, "image")?;

    let payload = match &spread_hash {
        Some(hash) => {
            let spread = SpreadSpectrumCodec::new(redundancy)?;
            let decoded = codec::decode(&content).context("Failed to decode image")?;
            debug!(redundancy, "Reading spread-spectrum watermark");
            spread.extract(&decoded.pixels, hash)
        }
        None => watermark::extract_from_image(&content),
    };

    let Some(payload) = payload else {
        bail!("No watermark found in {}", image.display());
    };

    info!(
        topic_id = %payload.topic_id(),
        sequence_number = payload.hedera_seq(),
        "Watermark found"
    );

    if quiet {
        return Ok(());
    }
    println!();
    println!("{}", "Watermark found".green().bold());
    println!();
    println!("   {} {}", "Original hash:".dimmed(), short_hash(payload.hash()));
    println!("   {} {}", "Clinic:".dimmed(), payload.clinic_id());
    println!("   {} {}", "Patient:".dimmed(), payload.patient_id());
    println!(
        "   {} {}/{}",
        "Ledger record:".dimmed(),
        payload.topic_id(),
        payload.hedera_seq()
    );
    println!("   {} {}", "Captured at:".dimmed(), payload.timestamp());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("Failed to serialize watermark")?
    );
    Ok(())
}
