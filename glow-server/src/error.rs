//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use glow_core::GlowError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Payload too large - upload exceeds the configured size
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - required service is not configured or available
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Glow core error
    #[error("Glow error: {0}")]
    Glow(#[from] GlowError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a payload too large error
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Glow(ref e) => match e {
                // Ledger transport failures → 503
                GlowError::LedgerUnavailable(_) | GlowError::LedgerTimeout { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }

                GlowError::LedgerRejected(_) => StatusCode::BAD_GATEWAY,

                // Client-provided invalid input → 400
                GlowError::Hashing(_)
                | GlowError::ImageCodec(_)
                | GlowError::InvalidPixelBuffer(_)
                | GlowError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

                // Understood but not processable → 422
                GlowError::WatermarkCapacity { .. }
                | GlowError::WatermarkLost(_)
                | GlowError::Decryption(_)
                | GlowError::LivenessTimeout { .. }
                | GlowError::LivenessFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,

                // Server-side failures → 500
                GlowError::InvalidCredentials(_)
                | GlowError::Encryption(_)
                | GlowError::Serialization(_)
                | GlowError::CaptureTask(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Glow(ref e) => match e {
                GlowError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
                GlowError::LedgerTimeout { .. } => "LEDGER_TIMEOUT",
                GlowError::LedgerRejected(_) => "LEDGER_REJECTED",
                GlowError::Hashing(_) => "HASHING_ERROR",
                GlowError::ImageCodec(_) => "INVALID_IMAGE",
                GlowError::InvalidPixelBuffer(_) => "INVALID_PIXEL_BUFFER",
                GlowError::InvalidConfig(_) => "INVALID_INPUT",
                GlowError::WatermarkCapacity { .. } => "WATERMARK_CAPACITY",
                GlowError::WatermarkLost(_) => "WATERMARK_LOST",
                GlowError::Decryption(_) => "DECRYPTION_FAILED",
                GlowError::LivenessTimeout { .. } => "LIVENESS_TIMEOUT",
                GlowError::LivenessFailed(_) => "LIVENESS_FAILED",
                GlowError::InvalidCredentials(_) => "LEDGER_MISCONFIGURED",
                GlowError::Encryption(_) => "ENCRYPTION_ERROR",
                GlowError::Serialization(_) => "SERIALIZATION_ERROR",
                GlowError::CaptureTask(_) => "INTERNAL_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Ledger and server-side details stay in the logs
            Self::Glow(ref e) => match e {
                GlowError::LedgerUnavailable(_) => "Ledger service unavailable".to_string(),
                GlowError::LedgerTimeout { operation, .. } => {
                    format!("Ledger {operation} timed out")
                }
                GlowError::LedgerRejected(_) => "Ledger rejected the request".to_string(),
                GlowError::InvalidCredentials(_) => "Ledger is misconfigured".to_string(),
                GlowError::Encryption(_) => "Encryption failed".to_string(),
                GlowError::Serialization(_) => "Serialization error".to_string(),
                GlowError::CaptureTask(_) => "Internal error".to_string(),
                GlowError::ImageCodec(_) => "Could not decode image".to_string(),
                _ => e.to_string(),
            },
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Glow(e) if e.is_ledger_error() => "ledger",
            Self::Glow(_) => "glow",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                client_message = %client_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_are_unavailable() {
        let err = ApiError::from(GlowError::LedgerUnavailable("mirror node down".into()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "LEDGER_UNAVAILABLE");
        assert_eq!(err.client_message(), "Ledger service unavailable");

        let err = ApiError::from(GlowError::LedgerTimeout {
            operation: "query",
            timeout_ms: 30_000,
        });
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.client_message(), "Ledger query timed out");
    }

    #[test]
    fn test_bad_image_is_client_error() {
        let err = ApiError::from(GlowError::ImageCodec("truncated PNG chunk at 0x40".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_IMAGE");
        assert!(!err.client_message().contains("0x40"));
    }

    #[test]
    fn test_watermark_capacity_is_unprocessable() {
        let err = ApiError::from(GlowError::WatermarkCapacity {
            needed: 2048,
            available: 64,
        });
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.client_message().contains("2048"));
    }

    #[test]
    fn test_credentials_are_not_leaked() {
        let err = ApiError::from(GlowError::InvalidCredentials("key 302e0201...".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Ledger is misconfigured");
        assert_eq!(err.error_category(), "ledger");
    }

    #[test]
    fn test_plain_variants() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::payload_too_large("x").status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::service_unavailable("x").error_code(),
            "SERVICE_UNAVAILABLE"
        );
        assert_eq!(ApiError::internal("boom").client_message(), "Internal error: boom");
    }
}
