//! Image and transport codecs.
//!
//! Bridges compressed images (JPEG/PNG) and the raw RGBA buffers the
//! watermark codec works on, plus the base64 / data URL text form images
//! travel in between the capture app and the pipeline.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};

use crate::error::{GlowError, Result};

/// Lowest JPEG quality accepted when a watermark has to survive re-encoding.
/// Anything lower rewrites least-significant bits wholesale.
pub const MIN_WATERMARK_JPEG_QUALITY: u8 = 90;

/// Decoded raster: RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / 4
    }
}

/// Output format for re-encoding a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "format")]
pub enum EncodeFormat {
    /// Lossless; every LSB survives.
    #[default]
    Png,
    /// Lossy; quality 1-100.
    Jpeg { quality: u8 },
}

impl EncodeFormat {
    /// MIME type for data URLs.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }

    /// Reject lossy settings that would wipe an embedded watermark.
    pub fn ensure_watermark_safe(&self) -> Result<()> {
        match self {
            Self::Jpeg { quality } if *quality < MIN_WATERMARK_JPEG_QUALITY => {
                Err(GlowError::InvalidConfig(format!(
                    "JPEG quality {quality} destroys watermark bits \
                     (minimum {MIN_WATERMARK_JPEG_QUALITY})"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Decode compressed image bytes into RGBA pixels.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| GlowError::ImageCodec(format!("Failed to decode image: {e}")))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        pixels: rgba.into_raw(),
        width,
        height,
    })
}

/// Encode RGBA pixels into the requested format.
pub fn encode(pixels: &[u8], width: u32, height: u32, format: EncodeFormat) -> Result<Vec<u8>> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(GlowError::InvalidPixelBuffer(format!(
            "{}x{} RGBA needs {expected} bytes, got {}",
            width,
            height,
            pixels.len()
        )));
    }

    let mut out = Cursor::new(Vec::new());
    match format {
        EncodeFormat::Png => {
            PngEncoder::new(&mut out)
                .write_image(pixels, width, height, ExtendedColorType::Rgba8)
                .map_err(|e| GlowError::ImageCodec(format!("PNG encoding failed: {e}")))?;
        }
        EncodeFormat::Jpeg { quality } => {
            // JPEG carries no alpha channel.
            let rgb: Vec<u8> = pixels
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(|e| GlowError::ImageCodec(format!("JPEG encoding failed: {e}")))?;
        }
    }

    Ok(out.into_inner())
}

/// Strip a `data:<mime>;base64,` prefix, leaving plain base64.
pub fn strip_data_url(input: &str) -> Result<&str> {
    if input.starts_with("data:") {
        let comma = input
            .find(',')
            .ok_or_else(|| GlowError::ImageCodec("Invalid data URL: no comma found".into()))?;
        Ok(&input[comma + 1..])
    } else {
        Ok(input)
    }
}

/// Decode base64 transport text (plain or data URL) into bytes.
pub fn base64_to_bytes(input: &str) -> Result<Vec<u8>> {
    let cleaned = strip_data_url(input.trim())?;
    BASE64
        .decode(cleaned)
        .map_err(|e| GlowError::ImageCodec(format!("Invalid base64: {e}")))
}

/// Encode bytes as plain base64.
pub fn bytes_to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Encode bytes as a `data:` URL with the given MIME type.
pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8, 255]);
            }
        }
        pixels
    }

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let pixels = gradient(16, 9);
        let png = encode(&pixels, 16, 9, EncodeFormat::Png).unwrap();
        let decoded = decode(&png).unwrap();
        assert_eq!(decoded.width, 16);
        assert_eq!(decoded.height, 9);
        assert_eq!(decoded.pixels, pixels);
        assert_eq!(decoded.pixel_count(), 144);
    }

    #[test]
    fn test_jpeg_encode_decodes_to_same_dimensions() {
        let pixels = gradient(32, 24);
        let jpeg = encode(&pixels, 32, 24, EncodeFormat::Jpeg { quality: 100 }).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = decode(&jpeg).unwrap();
        assert_eq!((decoded.width, decoded.height), (32, 24));
    }

    #[test]
    fn test_encode_rejects_wrong_buffer_size() {
        let err = encode(&[0u8; 10], 2, 2, EncodeFormat::Png).unwrap_err();
        assert!(matches!(err, GlowError::InvalidPixelBuffer(_)));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode(b"not an image").unwrap_err(),
            GlowError::ImageCodec(_)
        ));
    }

    #[test]
    fn test_strip_data_url() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,/9j/4").unwrap(), "/9j/4");
        assert_eq!(strip_data_url("/9j/4").unwrap(), "/9j/4");
        assert!(strip_data_url("data:image/jpeg;base64").is_err());
    }

    #[test]
    fn test_transport_roundtrip() {
        let bytes = vec![0u8, 1, 2, 250, 255];
        let url = to_data_url(&bytes, "image/png");
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(base64_to_bytes(&url).unwrap(), bytes);
        assert_eq!(base64_to_bytes(&bytes_to_base64(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_watermark_safe_quality() {
        assert!(EncodeFormat::Png.ensure_watermark_safe().is_ok());
        assert!(EncodeFormat::Jpeg { quality: 100 }.ensure_watermark_safe().is_ok());
        assert!(EncodeFormat::Jpeg { quality: 75 }.ensure_watermark_safe().is_err());
    }
}
