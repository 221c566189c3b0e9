//! Hedera operator configuration and credential parsing.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use zeroize::Zeroizing;

use crate::error::{GlowError, Result};

/// Default bound on a single ledger submission or query.
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(30);

/// PKCS#8 DER prefix of an Ed25519 private key, as Hedera exports it.
const ED25519_DER_PREFIX: &str = "302e020100300506032b657004220420";

/// DER prefix of a secp256k1 private key, as Hedera exports it.
const ECDSA_DER_PREFIX: &str = "3030020100300706052b8104000a04220420";

/// Hedera network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    /// Public mirror node REST base URL.
    pub fn mirror_node_url(&self) -> &'static str {
        match self {
            Self::Testnet => "https://testnet.mirrornode.hedera.com",
            Self::Mainnet => "https://mainnet.mirrornode.hedera.com",
        }
    }
}

impl FromStr for Network {
    type Err = GlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(GlowError::InvalidConfig(format!(
                "Unknown Hedera network '{other}' (expected testnet or mainnet)"
            ))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Testnet => f.write_str("testnet"),
            Self::Mainnet => f.write_str("mainnet"),
        }
    }
}

/// Hedera entity id, `shard.realm.num`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
}

impl AccountId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl FromStr for AccountId {
    type Err = GlowError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GlowError::InvalidCredentials(format!("Invalid account id '{s}'"));
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u64> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };
        let id = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// Encoding of an operator private key string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// `0x`-prefixed secp256k1 hex.
    EcdsaHex,
    /// DER starting `3030`, Hedera's secp256k1 export.
    EcdsaDer,
    /// PKCS#8 DER Ed25519.
    Ed25519Der,
    /// 32 raw bytes as hex.
    Ed25519Raw,
}

/// Classify an operator key string without parsing it.
pub fn detect_key_kind(key: &str) -> KeyKind {
    let key = key.trim();
    if key.starts_with("0x") {
        KeyKind::EcdsaHex
    } else if key.starts_with("3030") {
        KeyKind::EcdsaDer
    } else if key.to_ascii_lowercase().starts_with(ED25519_DER_PREFIX) {
        KeyKind::Ed25519Der
    } else {
        KeyKind::Ed25519Raw
    }
}

/// Signature scheme of an operator key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Ed25519,
    EcdsaSecp256k1,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => f.write_str("ed25519"),
            Self::EcdsaSecp256k1 => f.write_str("ecdsa-secp256k1"),
        }
    }
}

/// Operator private key: 32 secret bytes and the scheme they belong to.
pub struct OperatorKey {
    algorithm: KeyAlgorithm,
    secret: Zeroizing<[u8; 32]>,
}

impl OperatorKey {
    /// Parse an operator key in any of the encodings Hedera tooling exports:
    /// `0x` secp256k1 hex, `3030` secp256k1 DER, Ed25519 DER or raw Ed25519
    /// hex.
    pub fn parse(key: &str) -> Result<Self> {
        let key = key.trim();
        let (algorithm, hex_body) = match detect_key_kind(key) {
            KeyKind::EcdsaHex => (KeyAlgorithm::EcdsaSecp256k1, &key[2..]),
            KeyKind::EcdsaDer => {
                let body = strip_prefix_ci(key, ECDSA_DER_PREFIX).ok_or_else(|| {
                    GlowError::InvalidCredentials(
                        "ECDSA DER operator key has an unexpected header".into(),
                    )
                })?;
                (KeyAlgorithm::EcdsaSecp256k1, body)
            }
            KeyKind::Ed25519Der => (KeyAlgorithm::Ed25519, &key[ED25519_DER_PREFIX.len()..]),
            KeyKind::Ed25519Raw => (KeyAlgorithm::Ed25519, key),
        };

        let bytes = Zeroizing::new(hex::decode(hex_body).map_err(|_| {
            GlowError::InvalidCredentials("Operator key is not valid hex".into())
        })?);
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            GlowError::InvalidCredentials(format!(
                "{algorithm} operator key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        let secret = Zeroizing::new(secret);
        if secret.iter().all(|b| *b == 0) {
            return Err(GlowError::InvalidCredentials("Operator key is all zeroes".into()));
        }

        Ok(Self { algorithm, secret })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Ed25519 public key, hex. `None` for ECDSA keys.
    pub fn public_key_hex(&self) -> Option<String> {
        match self.algorithm {
            KeyAlgorithm::Ed25519 => {
                let signing = SigningKey::from_bytes(&self.secret);
                Some(hex::encode(signing.verifying_key().to_bytes()))
            }
            KeyAlgorithm::EcdsaSecp256k1 => None,
        }
    }

    /// Convert into the SDK key used to sign transactions.
    #[cfg(feature = "network")]
    pub(crate) fn to_sdk_key(&self) -> Result<hedera::PrivateKey> {
        let parsed = match self.algorithm {
            KeyAlgorithm::Ed25519 => hedera::PrivateKey::from_bytes_ed25519(self.secret.as_slice()),
            KeyAlgorithm::EcdsaSecp256k1 => {
                hedera::PrivateKey::from_bytes_ecdsa(self.secret.as_slice())
            }
        };
        parsed.map_err(|e| {
            GlowError::InvalidCredentials(format!("Operator key rejected by SDK: {e}"))
        })
    }
}

impl fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorKey")
            .field("algorithm", &self.algorithm)
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..])
}

/// Ledger connection settings.
#[derive(Clone)]
pub struct HederaConfig {
    pub operator_id: String,
    pub operator_key: String,
    pub network: Network,
    /// Existing clinic topic to bind on startup.
    pub topic_id: Option<String>,
    /// Mirror node override; defaults to the network's public mirror.
    pub mirror_url: Option<String>,
    pub timeout: Duration,
}

impl Default for HederaConfig {
    fn default() -> Self {
        Self {
            operator_id: String::new(),
            operator_key: String::new(),
            network: Network::Testnet,
            topic_id: None,
            mirror_url: None,
            timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }
}

impl fmt::Debug for HederaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HederaConfig")
            .field("operator_id", &self.operator_id)
            .field("operator_key", &"[REDACTED]")
            .field("network", &self.network)
            .field("topic_id", &self.topic_id)
            .field("mirror_url", &self.mirror_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HederaConfig {
    /// Load from `HEDERA_*` environment variables.
    ///
    /// Credentials are only read here; [`HederaConfig::credentials`] validates
    /// them.
    pub fn from_env() -> Result<Self> {
        let network = match std::env::var("HEDERA_NETWORK") {
            Ok(value) => value.parse()?,
            Err(_) => Network::default(),
        };

        let timeout = std::env::var("LEDGER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LEDGER_TIMEOUT);

        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Ok(Self {
            operator_id: std::env::var("HEDERA_OPERATOR_ID").unwrap_or_default(),
            operator_key: std::env::var("HEDERA_OPERATOR_KEY").unwrap_or_default(),
            network,
            topic_id: non_empty("HEDERA_TOPIC_ID"),
            mirror_url: non_empty("HEDERA_MIRROR_URL"),
            timeout,
        })
    }

    /// Mirror node base URL in effect.
    pub fn mirror_url(&self) -> &str {
        self.mirror_url
            .as_deref()
            .unwrap_or_else(|| self.network.mirror_node_url())
            .trim_end_matches('/')
    }

    /// Validate and parse the operator credentials.
    pub fn credentials(&self) -> Result<(AccountId, OperatorKey)> {
        if self.operator_id.trim().is_empty() || self.operator_key.trim().is_empty() {
            return Err(GlowError::InvalidCredentials(
                "HEDERA_OPERATOR_ID and HEDERA_OPERATOR_KEY are required".into(),
            ));
        }
        Ok((self.operator_id.parse()?, OperatorKey::parse(&self.operator_key)?))
    }
}
