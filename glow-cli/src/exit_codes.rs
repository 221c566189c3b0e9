//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts tell a modified image apart from an unreachable
//! ledger or a missing file.

use glow_core::GlowError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
#[allow(dead_code)] // clap exits with this code itself
pub const USAGE_ERROR: i32 = 64;

/// Data format error (image modified, watermark missing, bad bundle).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Ledger unreachable, timed out, or holds no record for the proof.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let code = match err.chain().find_map(|e| e.downcast_ref::<GlowError>()) {
            Some(glow) => classify(glow),
            None => classify_message(&message),
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

fn classify(err: &GlowError) -> i32 {
    match err {
        e if e.is_ledger_error() => NETWORK_ERROR,
        GlowError::Decryption(_)
        | GlowError::Serialization(_)
        | GlowError::WatermarkCapacity { .. }
        | GlowError::WatermarkLost(_)
        | GlowError::ImageCodec(_) => VERIFICATION_FAILED,
        GlowError::Hashing(_) => INPUT_ERROR,
        _ => GENERAL_ERROR,
    }
}

fn classify_message(message: &str) -> i32 {
    if message.contains("Failed to read") {
        INPUT_ERROR
    } else if message.contains("Verification failed")
        || message.contains("has been modified")
        || message.contains("No watermark")
        || message.contains("Failed to parse bundle")
    {
        VERIFICATION_FAILED
    } else if message.contains("ledger") || message.contains("Ledger") {
        NETWORK_ERROR
    } else if message.contains("Failed to write") {
        IO_ERROR
    } else {
        GENERAL_ERROR
    }
}
