//! AES-256-GCM vault for certified images.
//!
//! Ciphertext layout: `nonce (12 bytes) || ciphertext+tag`. Every call to
//! [`encrypt`] draws a fresh random nonce, so a key can safely seal many
//! images.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec;
use crate::error::{GlowError, Result};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A 256-bit symmetric key, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Import raw key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            GlowError::Encryption(format!(
                "Key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// Export raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

impl Serialize for EncryptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for EncryptionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut bytes = bytes_serde::deserialize(deserializer)?;
        let key = Self::from_bytes(&bytes).map_err(serde::de::Error::custom);
        bytes.zeroize();
        key
    }
}

/// Serde adapter writing `Vec<u8>` as a byte string (compact in CBOR) and
/// reading either a byte string or an integer array (JSON).
pub(crate) mod bytes_serde {
    use serde::de::{Deserializer, SeqAccess, Visitor};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = Vec<u8>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a byte string or byte array")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(v.to_vec())
            }

            fn visit_byte_buf<E: serde::de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(v)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(b) = seq.next_element::<u8>()? {
                    out.push(b);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}

/// Generate a fresh random 256-bit key.
pub fn generate_key() -> EncryptionKey {
    let generated = Aes256Gcm::generate_key(OsRng);
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&generated);
    EncryptionKey(key)
}

/// Encrypt `plaintext`, returning `nonce || ciphertext`.
pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| GlowError::Encryption(format!("Invalid key: {e}")))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| GlowError::Encryption("AEAD encryption failed".into()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt `nonce || ciphertext` produced by [`encrypt`].
///
/// Fails on a wrong key, a truncated buffer, or any altered byte; corrupted
/// plaintext is never returned.
pub fn decrypt(sealed: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(GlowError::Decryption(format!(
            "Ciphertext too short: {} bytes",
            sealed.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| GlowError::Decryption(format!("Invalid key: {e}")))?;
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| GlowError::Decryption("Authentication failed".into()))
}

/// Encrypt the binary content of base64 transport text.
pub fn encrypt_transport(text: &str, key: &EncryptionKey) -> Result<Vec<u8>> {
    let bytes = codec::base64_to_bytes(text)?;
    encrypt(&bytes, key)
}

/// Decrypt and return the plaintext as a data URL.
pub fn decrypt_to_data_url(sealed: &[u8], key: &EncryptionKey, mime_type: &str) -> Result<String> {
    let bytes = decrypt(sealed, key)?;
    Ok(codec::to_data_url(&bytes, mime_type))
}
