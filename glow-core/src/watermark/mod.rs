//! Steganographic watermark for certified images.
//!
//! The primary codec ([`lsb`]) hides a [`WatermarkPayload`] in the blue
//! channel's least-significant bits. [`spread`] is an alternate codec that
//! trades capacity for resilience. Both operate on raw RGBA buffers; the
//! helpers below wrap them for compressed images and transport text.

pub mod lsb;
pub mod payload;
pub mod spread;

pub use lsb::{embed, extract, pixels_for_json_len, required_pixels, MAX_PAYLOAD_LEN};
pub use payload::WatermarkPayload;
pub use spread::{
    embed_spread_bit, extract_spread_bit, generate_pixel_sequence, SpreadSpectrumCodec,
};

use tracing::debug;

use crate::codec::{self, EncodeFormat};
use crate::error::Result;

/// Decode `image`, embed `payload`, re-encode as `format`.
///
/// Lossy formats below the watermark-safe quality are refused up front.
pub fn embed_in_image(
    image: &[u8],
    payload: &WatermarkPayload,
    format: EncodeFormat,
) -> Result<Vec<u8>> {
    format.ensure_watermark_safe()?;
    let decoded = codec::decode(image)?;
    let marked = embed(&decoded.pixels, payload)?;
    debug!(
        width = decoded.width,
        height = decoded.height,
        format = format.mime_type(),
        "Embedded watermark"
    );
    codec::encode(&marked, decoded.width, decoded.height, format)
}

/// Decode `image` and read its watermark, if any. Undecodable input counts
/// as unmarked.
pub fn extract_from_image(image: &[u8]) -> Option<WatermarkPayload> {
    let decoded = codec::decode(image).ok()?;
    extract(&decoded.pixels)
}

/// [`embed_in_image`] over base64 transport text, returning a data URL.
pub fn embed_in_transport(
    text: &str,
    payload: &WatermarkPayload,
    format: EncodeFormat,
) -> Result<String> {
    let image = codec::base64_to_bytes(text)?;
    let marked = embed_in_image(&image, payload, format)?;
    Ok(codec::to_data_url(&marked, format.mime_type()))
}

/// [`extract_from_image`] over base64 transport text.
pub fn extract_from_transport(text: &str) -> Option<WatermarkPayload> {
    let image = codec::base64_to_bytes(text).ok()?;
    extract_from_image(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlowError;
    use crate::ledger::CertificationProof;

    fn payload() -> WatermarkPayload {
        let proof = CertificationProof {
            transaction_id: "0.0.2@1700000000.000000001".into(),
            consensus_timestamp: "1700000000.000000001".into(),
            topic_id: "0.0.77".into(),
            sequence_number: 1,
        };
        let timestamp = "2026-03-01T10:00:00.000Z";
        WatermarkPayload::new("0".repeat(64), "clinic", "patient", &proof, timestamp)
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let pixels: Vec<u8> = (0..width * height * 4).map(|i| (i % 241) as u8).collect();
        codec::encode(&pixels, width, height, EncodeFormat::Png).unwrap()
    }

    #[test]
    fn test_png_image_roundtrip() {
        let marked = embed_in_image(&png(64, 64), &payload(), EncodeFormat::Png).unwrap();
        assert_eq!(extract_from_image(&marked), Some(payload()));
    }

    #[test]
    fn test_low_quality_jpeg_refused() {
        let err = embed_in_image(&png(64, 64), &payload(), EncodeFormat::Jpeg { quality: 60 })
            .unwrap_err();
        assert!(matches!(err, GlowError::InvalidConfig(_)));
    }

    #[test]
    fn test_small_image_capacity_error() {
        let err = embed_in_image(&png(8, 8), &payload(), EncodeFormat::Png).unwrap_err();
        assert!(matches!(err, GlowError::WatermarkCapacity { .. }));
    }

    #[test]
    fn test_transport_roundtrip() {
        let text = codec::to_data_url(&png(64, 64), "image/png");
        let marked = embed_in_transport(&text, &payload(), EncodeFormat::Png).unwrap();
        assert!(marked.starts_with("data:image/png;base64,"));
        assert_eq!(extract_from_transport(&marked), Some(payload()));
    }

    #[test]
    fn test_garbage_is_unmarked() {
        assert_eq!(extract_from_image(b"garbage"), None);
        assert_eq!(extract_from_transport("!!!"), None);
    }
}
