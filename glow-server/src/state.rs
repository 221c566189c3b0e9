//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use glow_core::{HederaConfig, LedgerNotary, MemoryConsensusLog, VerificationService};

use crate::config::{Config, LedgerBackend};
use crate::error::ApiError;
use crate::validation::DEFAULT_MAX_FILE_SIZE;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Ledger handle used for proof lookups and readiness
    pub notary: Arc<LedgerNotary>,
    /// Verification over the same notary
    pub verifier: VerificationService,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    pub fn new(notary: Arc<LedgerNotary>) -> Self {
        Self {
            verifier: VerificationService::new(Arc::clone(&notary)),
            notary,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// State over an empty process-local ledger.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(LedgerNotary::new(Arc::new(MemoryConsensusLog::new()))))
    }

    pub fn with_max_file_size(mut self, bytes: usize) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Open the ledger named by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let notary = match &config.ledger {
            LedgerBackend::Memory => {
                tracing::warn!("Ledger: in-memory log, every lookup starts empty");
                LedgerNotary::new(Arc::new(MemoryConsensusLog::new()))
            }
            LedgerBackend::Journal(path) => {
                let log = MemoryConsensusLog::open_persistent(path)?;
                tracing::info!(path = %path.display(), "Ledger: local journal");
                LedgerNotary::new(Arc::new(log))
            }
            LedgerBackend::Hedera => {
                let hedera = HederaConfig::from_env()?;
                tracing::info!(network = %hedera.network, "Ledger: Hedera");
                LedgerNotary::initialize(&hedera)?
            }
        };
        Ok(Self::new(Arc::new(notary)).with_max_file_size(config.max_file_size()))
    }
}
