//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use glow_core::{CertificationResult, HederaConfig, LedgerNotary, MemoryConsensusLog};
use tracing::{debug, info};

/// Build the bundle output path from the image path.
///
/// Transforms `photo.png` into `photo.png.glow`.
pub fn build_bundle_path(file: &Path) -> PathBuf {
    file.with_extension(format!(
        "{}.glow",
        file.extension().and_then(|e| e.to_str()).unwrap_or("bin")
    ))
}

/// Read an input file with a context message the exit code classifier
/// recognises.
pub fn read_input(path: &Path, what: &str) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {what}: {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Read {what}");
    Ok(bytes)
}

/// Load a certification bundle, trying CBOR first then JSON.
pub fn load_bundle(path: &Path) -> Result<CertificationResult> {
    let bytes = read_input(path, "bundle")?;

    let bundle = if let Ok(bundle) = CertificationResult::from_cbor(&bytes) {
        debug!(format = "cbor", "Parsed bundle");
        bundle
    } else if let Ok(bundle) = serde_json::from_slice(&bytes) {
        debug!(format = "json", "Parsed bundle");
        bundle
    } else {
        bail!("Failed to parse bundle file (tried CBOR and JSON)");
    };

    Ok(bundle)
}

/// Open a ledger notary: the local journal when given, otherwise Hedera from
/// `HEDERA_*` environment variables.
pub fn open_notary(journal: Option<&Path>) -> Result<LedgerNotary> {
    match journal {
        Some(path) => {
            let log = MemoryConsensusLog::open_persistent(path)
                .with_context(|| format!("Failed to open ledger journal {}", path.display()))?;
            info!(path = %path.display(), "Using local ledger journal");
            Ok(LedgerNotary::new(Arc::new(log)))
        }
        None => {
            let config = HederaConfig::from_env().context("Invalid Hedera ledger configuration")?;
            let notary =
                LedgerNotary::initialize(&config).context("Failed to connect to Hedera ledger")?;
            Ok(notary)
        }
    }
}

/// File extension for an encoded image, from its magic bytes.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else {
        "bin"
    }
}

/// Shorten a hex digest for display.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}
