//! Spread-spectrum watermark.
//!
//! Each message bit is written to `redundancy` pseudo-randomly chosen pixels
//! and read back by majority vote, so scattered LSB damage from mild
//! recompression does not flip the bit. Pixel selection is a deterministic
//! xorshift32 stream seeded by the first 32 bits of the image hash, so the
//! verifier needs the hash to find the bits again.
//!
//! The message frame is the same as the [`lsb`](super::lsb) codec. The
//! capture pipeline does not use this path.

use std::collections::HashSet;

use crate::error::{GlowError, Result};

use super::lsb::{frame, parse_header, HEADER_LEN};
use super::payload::WatermarkPayload;

/// Default pixels per bit. Odd, so votes never tie.
pub const DEFAULT_REDUNDANCY: usize = 7;

const BLUE: usize = 2;

/// Marsaglia xorshift32.
#[derive(Debug, Clone)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    /// The low bit is forced on so a zero seed cannot stall the generator.
    pub fn new(seed: u32) -> Self {
        Self { state: seed | 1 }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform index in `0..bound`.
    pub fn next_index(&mut self, bound: usize) -> usize {
        ((self.next_u32() as u64 * bound as u64) >> 32) as usize
    }
}

/// Seed taken from the first 8 hex characters of a hash; unparsable input
/// seeds with 0.
pub fn seed_from_hash(hash: &str) -> u32 {
    hash.get(..8)
        .and_then(|prefix| u32::from_str_radix(prefix, 16).ok())
        .unwrap_or(0)
}

/// Distinct pixel indices in draw order.
///
/// Returns `min(sequence_length, pixel_count)` indices. The sequence for a
/// given seed is prefix-stable: a longer request starts with the shorter one.
pub fn generate_pixel_sequence(
    hash_seed: &str,
    pixel_count: usize,
    sequence_length: usize,
) -> Vec<usize> {
    let target = sequence_length.min(pixel_count);
    let mut rng = Xorshift32::new(seed_from_hash(hash_seed));
    let mut seen = HashSet::with_capacity(target);
    let mut indices = Vec::with_capacity(target);

    while indices.len() < target {
        let index = rng.next_index(pixel_count);
        if seen.insert(index) {
            indices.push(index);
        }
    }
    indices
}

/// Write `bit` into the blue LSB of every listed pixel.
pub fn embed_spread_bit(pixels: &mut [u8], pixel_indices: &[usize], bit: u8) {
    for &index in pixel_indices {
        let channel = index * 4 + BLUE;
        if let Some(value) = pixels.get_mut(channel) {
            *value = (*value & 0xFE) | (bit & 1);
        }
    }
}

/// Majority vote over the blue LSBs of the listed pixels.
pub fn extract_spread_bit(pixels: &[u8], pixel_indices: &[usize]) -> u8 {
    let ones = pixel_indices
        .iter()
        .filter(|&&index| pixels.get(index * 4 + BLUE).is_some_and(|v| v & 1 == 1))
        .count();
    u8::from(ones * 2 > pixel_indices.len())
}

/// Framed message codec over spread bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadSpectrumCodec {
    redundancy: usize,
}

impl Default for SpreadSpectrumCodec {
    fn default() -> Self {
        Self {
            redundancy: DEFAULT_REDUNDANCY,
        }
    }
}

impl SpreadSpectrumCodec {
    pub fn new(redundancy: usize) -> Result<Self> {
        if redundancy == 0 {
            return Err(GlowError::InvalidConfig(
                "Spread redundancy must be at least 1".into(),
            ));
        }
        Ok(Self { redundancy })
    }

    pub fn redundancy(&self) -> usize {
        self.redundancy
    }

    /// Embed `payload`, seeding pixel selection from `payload.hash`.
    pub fn embed(&self, pixels: &[u8], payload: &WatermarkPayload) -> Result<Vec<u8>> {
        if pixels.len() % 4 != 0 {
            return Err(GlowError::InvalidPixelBuffer(format!(
                "RGBA buffer length {} is not a multiple of 4",
                pixels.len()
            )));
        }

        let message = frame(payload)?;
        let available = pixels.len() / 4;
        let needed = message.len() * 8 * self.redundancy;
        if needed > available {
            return Err(GlowError::WatermarkCapacity { needed, available });
        }

        let sequence = generate_pixel_sequence(payload.hash(), available, needed);
        let mut out = pixels.to_vec();
        for (bit_index, indices) in sequence.chunks(self.redundancy).enumerate() {
            let bit = (message[bit_index / 8] >> (7 - bit_index % 8)) & 1;
            embed_spread_bit(&mut out, indices, bit);
        }
        Ok(out)
    }

    /// Extract a payload embedded with the same `seed_hash` and redundancy.
    pub fn extract(&self, pixels: &[u8], seed_hash: &str) -> Option<WatermarkPayload> {
        let available = pixels.len() / 4;

        let header_bits = HEADER_LEN * 8 * self.redundancy;
        if header_bits > available {
            return None;
        }
        let sequence = generate_pixel_sequence(seed_hash, available, header_bits);
        let header = self.read_bytes(pixels, &sequence, 0, HEADER_LEN);
        let len = parse_header(&header)?;

        let total_bits = (HEADER_LEN + len) * 8 * self.redundancy;
        if total_bits > available {
            return None;
        }
        let sequence = generate_pixel_sequence(seed_hash, available, total_bits);
        let json = self.read_bytes(pixels, &sequence, HEADER_LEN, len);
        WatermarkPayload::from_json(&json)
    }

    fn read_bytes(&self, pixels: &[u8], sequence: &[usize], start: usize, count: usize) -> Vec<u8> {
        (start..start + count)
            .map(|byte_index| {
                (0..8).fold(0u8, |acc, b| {
                    let bit_index = byte_index * 8 + b;
                    let from = bit_index * self.redundancy;
                    let bit = extract_spread_bit(pixels, &sequence[from..from + self.redundancy]);
                    (acc << 1) | bit
                })
            })
            .collect()
    }
}
