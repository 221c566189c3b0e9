//! Multipart form parsing helpers
//!
//! Shared parsing for the multipart/form-data upload endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size};

/// A file uploaded via multipart form. Its Content-Type is checked while
/// parsing and not kept.
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

/// Parsed multipart form fields: one `file` plus text fields by name.
#[derive(Debug, Default)]
pub struct MultipartFields {
    file: Option<FileField>,
    text_fields: HashMap<String, String>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request.
    ///
    /// The `file` field is checked for Content-Type and against
    /// `max_file_size` bytes; every other field is read as text.
    pub async fn parse(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut fields = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                validate_content_type(field.content_type())?;
                let file_name = field.file_name().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?
                    .to_vec();
                validate_file_size(data.len(), max_file_size)?;

                fields.file = Some(FileField { data, file_name });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read field '{}': {}", name, e))
                })?;
                fields.text_fields.insert(name, value);
            }
        }

        Ok(fields)
    }

    /// Get the file field, or fail if no file was uploaded.
    pub fn require_file(&self) -> Result<&FileField, ApiError> {
        self.file.as_ref().ok_or_else(|| {
            ApiError::bad_request("No file provided. Use 'file' field in multipart form.")
        })
    }

    /// Get a non-empty text field value.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.text_fields
            .get(name)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Get a text field, or fail naming the missing field.
    pub fn require_text(&self, name: &str) -> Result<&str, ApiError> {
        self.get_text(name)
            .ok_or_else(|| ApiError::bad_request(format!("No {} provided.", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_text(pairs: &[(&str, &str)]) -> MultipartFields {
        MultipartFields {
            file: None,
            text_fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_get_text() {
        let fields = with_text(&[("topic_id", "0.0.1001"), ("blank", "  ")]);

        assert_eq!(fields.get_text("topic_id"), Some("0.0.1001"));
        assert_eq!(fields.get_text("blank"), None);
        assert_eq!(fields.get_text("missing"), None);
    }

    #[test]
    fn test_require_text_names_field() {
        let fields = with_text(&[]);
        let err = fields.require_text("sequence_number").unwrap_err();
        assert!(err.to_string().contains("sequence_number"));
    }

    #[test]
    fn test_require_file_missing() {
        assert!(MultipartFields::default().require_file().is_err());
    }
}
