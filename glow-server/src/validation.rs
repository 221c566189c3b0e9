//! Request validation module
//!
//! Validation utilities for uploads and ledger coordinates.

use glow_core::ledger::AccountId;

use crate::error::ApiError;

/// Allowed MIME type categories for photo uploads
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "application/octet-stream"];

/// Default max file size in bytes (25 MB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Validates the Content-Type of an uploaded file
///
/// Accepts image/* and application/octet-stream. A missing Content-Type is
/// treated as binary.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{}'. \
                     Allowed types: image/*, application/octet-stream",
                    ct
                )))
            }
        }
        None => Ok(()),
    }
}

/// Validates the size of an uploaded file
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::payload_too_large(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else if size == 0 {
        Err(ApiError::bad_request("File is empty"))
    } else {
        Ok(())
    }
}

/// Validates a Hedera topic id (`shard.realm.num`).
pub fn validate_topic_id(topic_id: &str) -> Result<String, ApiError> {
    let trimmed = topic_id.trim();
    trimmed
        .parse::<AccountId>()
        .map(|_| trimmed.to_string())
        .map_err(|_| {
            ApiError::bad_request(format!(
                "Invalid topic_id '{}'. Expected shard.realm.num, e.g. 0.0.1001",
                topic_id
            ))
        })
}

/// Parses a topic sequence number. Sequences start at 1.
pub fn parse_sequence_number(value: &str) -> Result<u64, ApiError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ApiError::bad_request(format!(
            "Invalid sequence_number '{}'. Expected a positive integer",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_type_image() {
        assert!(validate_content_type(Some("image/jpeg")).is_ok());
        assert!(validate_content_type(Some("image/png")).is_ok());
        assert!(validate_content_type(Some("IMAGE/PNG")).is_ok()); // case insensitive
        assert!(validate_content_type(Some("application/octet-stream")).is_ok());
        assert!(validate_content_type(None).is_ok());
    }

    #[test]
    fn test_validate_content_type_rejected() {
        assert!(validate_content_type(Some("video/mp4")).is_err());
        assert!(validate_content_type(Some("text/html")).is_err());
        assert!(validate_content_type(Some("application/json")).is_err());
    }

    #[test]
    fn test_validate_file_size() {
        let max = 10 * 1024 * 1024;
        assert!(validate_file_size(1024, max).is_ok());
        assert!(validate_file_size(max, max).is_ok()); // exactly max
        assert!(matches!(
            validate_file_size(max + 1, max),
            Err(ApiError::PayloadTooLarge(_))
        ));
        assert!(matches!(
            validate_file_size(0, max),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_validate_topic_id() {
        assert_eq!(validate_topic_id(" 0.0.1001 ").unwrap(), "0.0.1001");
        assert!(validate_topic_id("0.0").is_err());
        assert!(validate_topic_id("topic-1").is_err());
        assert!(validate_topic_id("").is_err());
    }

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(parse_sequence_number("1").unwrap(), 1);
        assert_eq!(parse_sequence_number(" 42 ").unwrap(), 42);
        assert!(parse_sequence_number("0").is_err());
        assert!(parse_sequence_number("-3").is_err());
        assert!(parse_sequence_number("abc").is_err());
    }
}
