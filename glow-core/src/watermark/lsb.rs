//! Blue-channel LSB watermark.
//!
//! Message layout, one bit per pixel starting at pixel 0, MSB-first:
//!
//! ```text
//! +--------+-------------------+----------------------+
//! | "GLOW" | length (u32, BE)  | payload JSON (bytes) |
//! +--------+-------------------+----------------------+
//! ```

use crate::error::{GlowError, Result};

use super::payload::WatermarkPayload;

/// Frame marker identifying a watermarked image.
pub const MAGIC: &[u8; 4] = b"GLOW";

/// Magic plus length prefix, in bytes.
pub const HEADER_LEN: usize = 8;

/// Largest payload length accepted on extraction.
pub const MAX_PAYLOAD_LEN: usize = 10_000;

const BLUE: usize = 2;

/// Build the framed message for `payload`.
pub fn frame(payload: &WatermarkPayload) -> Result<Vec<u8>> {
    let json = payload.to_json()?;
    if json.len() > MAX_PAYLOAD_LEN {
        return Err(GlowError::Serialization(format!(
            "Watermark payload is {} bytes, limit is {MAX_PAYLOAD_LEN}",
            json.len()
        )));
    }

    let mut message = Vec::with_capacity(HEADER_LEN + json.len());
    message.extend_from_slice(MAGIC);
    message.extend_from_slice(&(json.len() as u32).to_be_bytes());
    message.extend_from_slice(&json);
    Ok(message)
}

/// Check the 8-byte header and return the declared payload length.
pub(crate) fn parse_header(header: &[u8]) -> Option<usize> {
    if header.len() < HEADER_LEN || &header[..4] != MAGIC {
        return None;
    }
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    (1..=MAX_PAYLOAD_LEN).contains(&len).then_some(len)
}

/// Number of pixels needed to carry `payload`.
pub fn required_pixels(payload: &WatermarkPayload) -> Result<usize> {
    Ok(frame(payload)?.len() * 8)
}

/// Number of pixels needed for a payload whose JSON is `json_len` bytes.
pub fn pixels_for_json_len(json_len: usize) -> usize {
    (HEADER_LEN + json_len) * 8
}

fn check_rgba(pixels: &[u8]) -> Result<usize> {
    if pixels.len() % 4 != 0 {
        return Err(GlowError::InvalidPixelBuffer(format!(
            "RGBA buffer length {} is not a multiple of 4",
            pixels.len()
        )));
    }
    Ok(pixels.len() / 4)
}

/// Embed `payload` and return the watermarked copy of `pixels`.
///
/// Only blue-channel least-significant bits of the first
/// `required_pixels(payload)` pixels change.
pub fn embed(pixels: &[u8], payload: &WatermarkPayload) -> Result<Vec<u8>> {
    let available = check_rgba(pixels)?;
    let message = frame(payload)?;
    let needed = message.len() * 8;
    if needed > available {
        return Err(GlowError::WatermarkCapacity { needed, available });
    }

    let mut out = pixels.to_vec();
    for (byte_index, byte) in message.iter().enumerate() {
        for bit_index in 0..8 {
            let bit = (byte >> (7 - bit_index)) & 1;
            let pixel = byte_index * 8 + bit_index;
            let channel = pixel * 4 + BLUE;
            out[channel] = (out[channel] & 0xFE) | bit;
        }
    }
    Ok(out)
}

fn read_bytes(pixels: &[u8], start_byte: usize, count: usize) -> Option<Vec<u8>> {
    let end_pixel = (start_byte + count) * 8;
    if end_pixel > pixels.len() / 4 {
        return None;
    }

    let bytes = (start_byte..start_byte + count)
        .map(|byte_index| {
            (0..8).fold(0u8, |acc, bit_index| {
                let pixel = byte_index * 8 + bit_index;
                (acc << 1) | (pixels[pixel * 4 + BLUE] & 1)
            })
        })
        .collect();
    Some(bytes)
}

/// Read back an embedded payload.
///
/// Returns `None` when no watermark is present or it is damaged: wrong
/// magic, a length of 0 or above [`MAX_PAYLOAD_LEN`], a buffer too short for
/// the declared length, or a payload that is not a valid record.
pub fn extract(pixels: &[u8]) -> Option<WatermarkPayload> {
    let header = read_bytes(pixels, 0, HEADER_LEN)?;
    let len = parse_header(&header)?;
    let json = read_bytes(pixels, HEADER_LEN, len)?;
    WatermarkPayload::from_json(&json)
}
