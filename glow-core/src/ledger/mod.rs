//! Ledger notarization over a consensus log.
//!
//! A [`LedgerNotary`] is an explicit handle over a [`ConsensusLog`]
//! transport. It owns the clinic topic binding and bounds every network call
//! with a timeout. Nothing here is global: several notaries for different
//! clinics can live side by side.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use glow_core::ledger::{LedgerNotary, MemoryConsensusLog};
//!
//! # async fn example() -> glow_core::Result<()> {
//! let notary = LedgerNotary::new(Arc::new(MemoryConsensusLog::new()));
//! let topic = notary.create_topic(Some("Clinic A")).await?;
//! println!("Clinic topic: {topic}");
//! # Ok(())
//! # }
//! ```

pub mod config;
mod memory;
#[cfg(feature = "network")]
mod hcs;
pub mod types;

pub use config::{
    detect_key_kind, AccountId, HederaConfig, KeyAlgorithm, KeyKind, Network, OperatorKey,
    DEFAULT_LEDGER_TIMEOUT,
};
pub use memory::{MemoryConsensusLog, MAX_MESSAGE_BYTES};
#[cfg(feature = "network")]
pub use hcs::HederaConsensusLog;
pub use types::{
    CertificationProof, LedgerEntry, MirrorMessage, NotarizationRecord, SubmitReceipt,
    RECORD_VERSION,
};

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::error::{GlowError, Result};
use crate::hash::is_valid_hash;

/// Append-only, externally ordered message log.
///
/// Implementations must be thread-safe (`Send + Sync`). Submissions must not
/// be retried internally.
#[async_trait]
pub trait ConsensusLog: Send + Sync {
    /// Create a topic and return its id.
    async fn create_topic(&self, memo: Option<&str>) -> Result<String>;

    /// Append `message` and wait for its consensus receipt.
    async fn submit_message(&self, topic_id: &str, message: &[u8]) -> Result<SubmitReceipt>;

    /// Read one message. `Ok(None)` when it does not exist.
    async fn get_message(&self, topic_id: &str, sequence_number: u64)
        -> Result<Option<MirrorMessage>>;

    /// Short transport name for logs.
    fn name(&self) -> &'static str;
}

/// Notarization handle with an explicit open/close lifecycle.
pub struct LedgerNotary {
    log: Arc<dyn ConsensusLog>,
    timeout: Duration,
    topic: OnceLock<String>,
    closed: AtomicBool,
}

impl std::fmt::Debug for LedgerNotary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerNotary")
            .field("transport", &self.log.name())
            .field("timeout", &self.timeout)
            .field("topic", &self.topic.get())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl LedgerNotary {
    /// Open a notary over an existing transport.
    pub fn new(log: Arc<dyn ConsensusLog>) -> Self {
        Self {
            log,
            timeout: DEFAULT_LEDGER_TIMEOUT,
            topic: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Bound for each submit or query.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate credentials and connect to Hedera.
    ///
    /// Fails with [`GlowError::InvalidCredentials`] for a malformed account
    /// id or key. Binds `config.topic_id` when present.
    #[cfg(feature = "network")]
    #[instrument(level = "info", skip_all, fields(network = %config.network))]
    pub fn initialize(config: &HederaConfig) -> Result<Self> {
        let (operator_id, operator_key) = config.credentials()?;
        let log = HederaConsensusLog::new(config, operator_id, &operator_key)?;
        let notary = Self::new(Arc::new(log)).with_timeout(config.timeout);
        if let Some(topic_id) = &config.topic_id {
            notary.set_topic(topic_id.clone())?;
        }
        info!(operator = %operator_id, "Ledger notary initialized");
        Ok(notary)
    }

    /// Create the clinic topic and bind it. Fails if a topic is already bound.
    #[instrument(level = "info", skip(self))]
    pub async fn create_topic(&self, memo: Option<&str>) -> Result<String> {
        self.ensure_open()?;
        if let Some(existing) = self.topic.get() {
            return Err(GlowError::InvalidConfig(format!(
                "Topic {existing} is already bound to this notary"
            )));
        }

        let topic_id = self.bounded("create_topic", self.log.create_topic(memo)).await?;
        self.topic.set(topic_id.clone()).map_err(|_| {
            GlowError::InvalidConfig("Another topic was bound concurrently".into())
        })?;
        info!(topic_id = %topic_id, "Topic created and bound");
        Ok(topic_id)
    }

    /// Bind an existing topic. Re-binding the same id is a no-op.
    pub fn set_topic(&self, topic_id: impl Into<String>) -> Result<()> {
        let topic_id = topic_id.into();
        if topic_id.parse::<AccountId>().is_err() {
            return Err(GlowError::InvalidConfig(format!("Invalid topic id '{topic_id}'")));
        }
        match self.topic.get() {
            Some(existing) if *existing == topic_id => Ok(()),
            Some(existing) => Err(GlowError::InvalidConfig(format!(
                "Topic {existing} is already bound to this notary"
            ))),
            None => self.topic.set(topic_id).map_err(|_| {
                GlowError::InvalidConfig("Another topic was bound concurrently".into())
            }),
        }
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.get().map(String::as_str)
    }

    /// Open with a topic bound.
    pub fn is_ready(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.topic.get().is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Append `record` to the bound topic and return the proof.
    ///
    /// No retry: a failed or timed-out submission is final for this capture.
    #[instrument(level = "info", skip_all, fields(hash = %record.hash))]
    pub async fn submit(&self, record: &NotarizationRecord) -> Result<CertificationProof> {
        self.ensure_open()?;
        let topic_id = self.topic.get().ok_or_else(|| {
            GlowError::LedgerUnavailable(
                "No topic ID set. Call create_topic() or set_topic() first.".into(),
            )
        })?;
        if !is_valid_hash(&record.hash) {
            return Err(GlowError::InvalidConfig(format!(
                "Record hash '{}' is not a SHA-256 hex digest",
                record.hash
            )));
        }

        let message = record.to_bytes()?;
        let receipt = self
            .bounded("submit", self.log.submit_message(topic_id, &message))
            .await?;

        info!(
            topic_id = %topic_id,
            sequence_number = receipt.sequence_number,
            transaction_id = %receipt.transaction_id,
            "Record notarized"
        );

        Ok(CertificationProof {
            transaction_id: receipt.transaction_id,
            consensus_timestamp: receipt.consensus_timestamp,
            topic_id: topic_id.clone(),
            sequence_number: receipt.sequence_number,
        })
    }

    /// Read the record at `topic_id`/`sequence_number`.
    ///
    /// `Ok(None)` when no such message exists; an error when the transport
    /// fails or the message is not a notarization record.
    #[instrument(level = "debug", skip(self))]
    pub async fn query(&self, topic_id: &str, sequence_number: u64) -> Result<Option<LedgerEntry>> {
        self.ensure_open()?;
        let message = self
            .bounded("query", self.log.get_message(topic_id, sequence_number))
            .await?;
        match message {
            Some(message) => Ok(Some(LedgerEntry::try_from(message)?)),
            None => {
                debug!(topic_id, sequence_number, "No ledger entry");
                Ok(None)
            }
        }
    }

    /// End the handle's lifecycle. Later calls fail with `LedgerUnavailable`.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(transport = self.log.name(), "Ledger notary closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(GlowError::LedgerUnavailable("Ledger notary is closed".into()));
        }
        Ok(())
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Ledger call timed out");
            GlowError::LedgerTimeout {
                operation,
                timeout_ms: self.timeout.as_millis() as u64,
            }
        })?
    }
}
