//! Verify command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;
use glow_core::{CertificationProof, VerificationService, VerificationStatus};
use tracing::{error, info, warn};

use crate::utils::{load_bundle, open_notary, read_input, short_hash};

/// Where the claimed proof comes from.
pub struct ProofSource {
    pub bundle: Option<PathBuf>,
    pub topic: Option<String>,
    pub sequence: Option<u64>,
    pub transaction_id: Option<String>,
}

impl ProofSource {
    fn resolve(self) -> Result<CertificationProof> {
        if let Some(path) = self.bundle {
            return Ok(load_bundle(&path)?.hedera);
        }
        match (self.topic, self.sequence) {
            (Some(topic_id), Some(sequence_number)) => Ok(CertificationProof {
                transaction_id: self.transaction_id.unwrap_or_else(|| "unknown".into()),
                consensus_timestamp: String::new(),
                topic_id,
                sequence_number,
            }),
            _ => bail!("Pass --bundle, or --topic together with --sequence"),
        }
    }
}

fn banner(text: &str, color: fn(&str) -> colored::ColoredString) {
    println!();
    println!("{}", color("╔════════════════════════════════════════╗"));
    println!("{}", color(&format!("║{text:^40}║")).bold());
    println!("{}", color("╚════════════════════════════════════════╝"));
    println!();
}

/// Execute the verify command.
pub async fn execute(
    journal: Option<PathBuf>,
    image: PathBuf,
    source: ProofSource,
    quiet: bool,
) -> Result<()> {
    let content = read_input(&image, "image")?;
    let proof = source.resolve()?;
    let notary = open_notary(journal.as_deref())?;
    let service = VerificationService::new(Arc::new(notary));

    let result = service.verify(&content, &proof).await;

    match result.status {
        VerificationStatus::Certified => {
            info!(
                topic_id = %proof.topic_id,
                sequence_number = proof.sequence_number,
                "Verification successful"
            );
            if !quiet {
                banner("CERTIFIED", |s| s.green());
                println!("   {} {}", "Hash:".dimmed(), short_hash(&result.hash));
                println!(
                    "   {} {}/{}",
                    "Ledger record:".dimmed(),
                    proof.topic_id,
                    proof.sequence_number
                );
                if let Some(at) = &result.captured_at {
                    println!("   {} {}", "Captured at:".dimmed(), at);
                }
                println!("   {}", result.message);
            }
            Ok(())
        }
        VerificationStatus::Modified => {
            error!(hash = %result.hash, "Image has been modified");
            if !quiet {
                banner("MODIFIED", |s| s.red());
                println!("   {}", result.message.red());
            }
            bail!("Verification failed: image has been modified since certification")
        }
        VerificationStatus::Unknown => {
            warn!(
                topic_id = %proof.topic_id,
                sequence_number = proof.sequence_number,
                "No ledger record"
            );
            if !quiet {
                banner("UNKNOWN", |s| s.yellow());
                println!("   {}", result.message);
            }
            bail!(
                "No ledger record for {}/{}",
                proof.topic_id,
                proof.sequence_number
            )
        }
    }
}
