//! SHA-256 content digests.
//!
//! Every certified capture is anchored by the digest of the bytes exactly as
//! they left the camera, before any watermark or re-encoding touches them.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::codec;
use crate::error::{GlowError, Result};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Compute the SHA-256 digest of `data` as 64 lowercase hex characters.
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Check `data` against a previously computed digest.
///
/// The comparison ignores the case of `expected`, so digests produced by
/// tools that emit uppercase hex still match.
pub fn verify_hash(data: &[u8], expected: &str) -> bool {
    compute_hash(data).eq_ignore_ascii_case(expected.trim())
}

/// Hash a UTF-8 string.
pub fn hash_str(text: &str) -> String {
    compute_hash(text.as_bytes())
}

/// Hash the binary content of base64 transport text (plain or data URL).
pub fn hash_transport(text: &str) -> Result<String> {
    let bytes = codec::base64_to_bytes(text)?;
    Ok(compute_hash(&bytes))
}

/// Read a file and hash its content.
pub fn hash_file(path: &Path) -> Result<String> {
    let data = std::fs::read(path).map_err(|e| {
        GlowError::Hashing(format!("Failed to read {}: {e}", path.display()))
    })?;
    debug!(path = %path.display(), bytes = data.len(), "Hashing file");
    Ok(compute_hash(&data))
}

/// Whether `value` looks like a hex-encoded SHA-256 digest.
pub fn is_valid_hash(value: &str) -> bool {
    value.len() == HASH_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}
