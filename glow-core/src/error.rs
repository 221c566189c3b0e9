use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlowError {
    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Image codec error: {0}")]
    ImageCodec(String),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Ledger rejected transaction: {0}")]
    LedgerRejected(String),

    #[error("Ledger {operation} timed out after {timeout_ms}ms")]
    LedgerTimeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Invalid operator credentials: {0}")]
    InvalidCredentials(String),

    #[error("Image too small for watermark: need {needed} pixels, have {available}")]
    WatermarkCapacity { needed: usize, available: usize },

    #[error("Invalid pixel buffer: {0}")]
    InvalidPixelBuffer(String),

    #[error("Watermark did not survive re-encoding: {0}")]
    WatermarkLost(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Liveness challenge '{challenge}' timed out")]
    LivenessTimeout { challenge: String },

    #[error("Liveness check failed: {0}")]
    LivenessFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Capture task failed: {0}")]
    CaptureTask(String),
}

impl GlowError {
    /// Whether the failure came from the ledger transport rather than the
    /// local pipeline.
    pub fn is_ledger_error(&self) -> bool {
        matches!(
            self,
            Self::LedgerUnavailable(_)
                | Self::LedgerRejected(_)
                | Self::LedgerTimeout { .. }
                | Self::InvalidCredentials(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GlowError>;
