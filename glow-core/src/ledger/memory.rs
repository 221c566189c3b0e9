//! In-process consensus log.
//!
//! Behaves like a topic service: append-only, one global ordering of
//! consensus timestamps, sequence numbers starting at 1 per topic. With a
//! journal path the log lives in a JSON file shared by every handle that
//! opens it. Each operation takes a lock on a sidecar `.lock` file, reloads
//! the journal, and appends write the merged result back before releasing
//! the lock, so a CLI and a server pointed at the same journal see each
//! other's records.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::AccountId;
use super::types::{MirrorMessage, SubmitReceipt};
use super::ConsensusLog;
use crate::error::{GlowError, Result};

/// First topic number handed out.
const FIRST_TOPIC_NUM: u64 = 1001;

/// Largest message a topic accepts, matching the Hedera HCS limit.
pub const MAX_MESSAGE_BYTES: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Journal {
    next_topic: u64,
    last_consensus_nanos: i64,
    topics: BTreeMap<String, Topic>,
}

impl Default for Journal {
    fn default() -> Self {
        Self {
            next_topic: FIRST_TOPIC_NUM,
            last_consensus_nanos: 0,
            topics: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Topic {
    memo: Option<String>,
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMessage {
    transaction_id: String,
    consensus_timestamp: String,
    message: String,
}

/// Advisory lock on `<journal>.lock`, released on drop.
///
/// The journal itself is replaced by rename on every write, so the lock
/// lives on a separate file whose inode never changes.
struct JournalLock {
    _file: File,
}

impl JournalLock {
    fn acquire(journal: &Path, exclusive: bool) -> Result<Self> {
        let path = journal.with_extension("lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                GlowError::LedgerUnavailable(format!(
                    "Failed to open journal lock {}: {e}",
                    path.display()
                ))
            })?;
        let locked = if exclusive {
            FileExt::lock_exclusive(&file)
        } else {
            FileExt::lock_shared(&file)
        };
        locked.map_err(|e| {
            GlowError::LedgerUnavailable(format!("Failed to lock journal {}: {e}", path.display()))
        })?;
        Ok(Self { _file: file })
    }
}

/// Read the journal at `path`. `Ok(None)` when it does not exist yet.
fn load_journal(path: &Path) -> Result<Option<Journal>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GlowError::LedgerUnavailable(format!(
                "Failed to read journal {}: {e}",
                path.display()
            )))
        }
    };
    // A journal that no longer parses is a broken ledger, not bad caller input.
    serde_json::from_slice(&bytes).map(Some).map_err(|e| {
        GlowError::LedgerUnavailable(format!("Corrupt journal {}: {e}", path.display()))
    })
}

fn write_journal(path: &Path, journal: &Journal) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(journal)
        .map_err(|e| GlowError::Serialization(format!("Journal: {e}")))?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)
        .and_then(|_| std::fs::rename(&tmp, path))
        .map_err(|e| {
            GlowError::LedgerUnavailable(format!(
                "Failed to write journal {}: {e}",
                path.display()
            ))
        })
}

/// Append-only consensus log held in memory, optionally backed by a shared
/// journal file.
///
/// Journal access is blocking file I/O; it is meant for local development
/// and tests, not for production traffic.
#[derive(Debug)]
pub struct MemoryConsensusLog {
    payer: AccountId,
    journal_path: Option<PathBuf>,
    state: Mutex<Journal>,
}

impl Default for MemoryConsensusLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConsensusLog {
    pub fn new() -> Self {
        Self {
            payer: AccountId::new(0, 0, 2),
            journal_path: None,
            state: Mutex::new(Journal::default()),
        }
    }

    /// Account shown as the payer in transaction ids.
    pub fn with_payer(mut self, payer: AccountId) -> Self {
        self.payer = payer;
        self
    }

    /// Open a journal-backed log. An existing journal is read once here so
    /// a corrupt file fails at startup rather than on first use.
    pub fn open_persistent(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let journal = {
            let _lock = JournalLock::acquire(&path, false)?;
            load_journal(&path)?
        };
        if let Some(journal) = &journal {
            info!(path = %path.display(), topics = journal.topics.len(), "Loaded ledger journal");
        }

        Ok(Self {
            journal_path: Some(path),
            state: Mutex::new(journal.unwrap_or_default()),
            ..Self::new()
        })
    }

    /// Number of messages on `topic_id`, if it exists.
    pub fn message_count(&self, topic_id: &str) -> Option<usize> {
        self.read(|journal| journal.topics.get(topic_id).map(|topic| topic.messages.len()))
            .ok()
            .flatten()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Journal>> {
        self.state
            .lock()
            .map_err(|_| GlowError::LedgerUnavailable("Ledger state lock poisoned".into()))
    }

    /// Run `f` against the latest state, refreshed from the journal.
    fn read<T>(&self, f: impl FnOnce(&Journal) -> T) -> Result<T> {
        let mut state = self.lock()?;
        if let Some(path) = &self.journal_path {
            let _lock = JournalLock::acquire(path, false)?;
            if let Some(journal) = load_journal(path)? {
                *state = journal;
            }
        }
        Ok(f(&state))
    }

    /// Apply `f` and make the result durable.
    ///
    /// With a journal, `f` runs on a fresh copy loaded under the exclusive
    /// lock and the in-memory state only changes once the write succeeded.
    /// Without one, `f` must not mutate before it can fail.
    fn update<T>(&self, f: impl FnOnce(&mut Journal) -> Result<T>) -> Result<T> {
        let mut state = self.lock()?;
        let Some(path) = &self.journal_path else {
            return f(&mut state);
        };

        let _lock = JournalLock::acquire(path, true)?;
        let mut journal = load_journal(path)?.unwrap_or_else(|| state.clone());
        let value = f(&mut journal)?;
        write_journal(path, &journal)?;
        *state = journal;
        Ok(value)
    }
}

/// Next strictly increasing consensus time, in nanoseconds since the epoch.
fn next_consensus_nanos(last: i64) -> i64 {
    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(last);
    now.max(last + 1)
}

fn format_consensus(nanos: i64) -> String {
    format!("{}.{:09}", nanos.div_euclid(1_000_000_000), nanos.rem_euclid(1_000_000_000))
}

#[async_trait]
impl ConsensusLog for MemoryConsensusLog {
    async fn create_topic(&self, memo: Option<&str>) -> Result<String> {
        let topic_id = self.update(|journal| {
            let topic_id = AccountId::new(0, 0, journal.next_topic).to_string();
            journal.next_topic += 1;
            journal.topics.insert(
                topic_id.clone(),
                Topic {
                    memo: memo.map(str::to_owned),
                    messages: Vec::new(),
                },
            );
            Ok(topic_id)
        })?;
        debug!(topic_id = %topic_id, "Created topic");
        Ok(topic_id)
    }

    async fn submit_message(&self, topic_id: &str, message: &[u8]) -> Result<SubmitReceipt> {
        if message.len() > MAX_MESSAGE_BYTES {
            return Err(GlowError::LedgerRejected(format!(
                "MESSAGE_SIZE_TOO_LARGE: {} bytes",
                message.len()
            )));
        }

        self.update(|journal| {
            let nanos = next_consensus_nanos(journal.last_consensus_nanos);
            let consensus_timestamp = format_consensus(nanos);
            let transaction_id = format!("{}@{}", self.payer, consensus_timestamp);

            let topic = journal.topics.get_mut(topic_id).ok_or_else(|| {
                GlowError::LedgerRejected(format!("INVALID_TOPIC_ID: {topic_id}"))
            })?;
            topic.messages.push(StoredMessage {
                transaction_id: transaction_id.clone(),
                consensus_timestamp: consensus_timestamp.clone(),
                message: BASE64.encode(message),
            });
            let sequence_number = topic.messages.len() as u64;
            journal.last_consensus_nanos = nanos;

            Ok(SubmitReceipt {
                transaction_id,
                consensus_timestamp,
                sequence_number,
            })
        })
    }

    async fn get_message(
        &self,
        topic_id: &str,
        sequence_number: u64,
    ) -> Result<Option<MirrorMessage>> {
        self.read(|journal| {
            let index = usize::try_from(sequence_number.checked_sub(1)?).ok()?;
            let stored = journal.topics.get(topic_id)?.messages.get(index)?;
            Some(MirrorMessage {
                consensus_timestamp: stored.consensus_timestamp.clone(),
                topic_id: topic_id.to_string(),
                sequence_number,
                message: stored.message.clone(),
            })
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequence_numbers_start_at_one() {
        let log = MemoryConsensusLog::new();
        let topic = log.create_topic(Some("clinic")).await.unwrap();
        assert_eq!(topic, "0.0.1001");

        let first = log.submit_message(&topic, b"a").await.unwrap();
        let second = log.submit_message(&topic, b"b").await.unwrap();
        assert_eq!(first.sequence_number, 1);
        assert_eq!(second.sequence_number, 2);
        assert!(first.transaction_id.starts_with("0.0.2@"));
        assert_eq!(log.message_count(&topic), Some(2));
    }

    #[tokio::test]
    async fn test_consensus_timestamps_strictly_increase() {
        let log = MemoryConsensusLog::new();
        let topic = log.create_topic(None).await.unwrap();
        let mut last = String::new();
        for _ in 0..50 {
            let receipt = log.submit_message(&topic, b"x").await.unwrap();
            let (secs, nanos) = receipt.consensus_timestamp.split_once('.').unwrap();
            assert_eq!(nanos.len(), 9);
            let current = format!("{secs:0>12}.{nanos}");
            assert!(current > last);
            last = current;
        }
    }

    #[tokio::test]
    async fn test_get_message() {
        let log = MemoryConsensusLog::new();
        let topic = log.create_topic(None).await.unwrap();
        log.submit_message(&topic, b"hello").await.unwrap();

        let message = log.get_message(&topic, 1).await.unwrap().unwrap();
        assert_eq!(BASE64.decode(&message.message).unwrap(), b"hello");
        assert_eq!(message.sequence_number, 1);
        assert!(log.get_message(&topic, 0).await.unwrap().is_none());
        assert!(log.get_message(&topic, 2).await.unwrap().is_none());
        assert!(log.get_message("0.0.9", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_topic_and_oversize_rejected() {
        let log = MemoryConsensusLog::new();
        assert!(matches!(
            log.submit_message("0.0.9", b"x").await.unwrap_err(),
            GlowError::LedgerRejected(_)
        ));

        let topic = log.create_topic(None).await.unwrap();
        let big = vec![b'x'; MAX_MESSAGE_BYTES + 1];
        assert!(matches!(
            log.submit_message(&topic, &big).await.unwrap_err(),
            GlowError::LedgerRejected(_)
        ));
    }

    #[tokio::test]
    async fn test_journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let topic = {
            let log = MemoryConsensusLog::open_persistent(&path).unwrap();
            let topic = log.create_topic(Some("clinic")).await.unwrap();
            log.submit_message(&topic, b"persisted").await.unwrap();
            topic
        };

        let reopened = MemoryConsensusLog::open_persistent(&path).unwrap();
        let message = reopened.get_message(&topic, 1).await.unwrap().unwrap();
        assert_eq!(BASE64.decode(&message.message).unwrap(), b"persisted");
        assert_eq!(reopened.create_topic(None).await.unwrap(), "0.0.1002");
    }

    #[tokio::test]
    async fn test_handles_on_one_journal_share_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let writer = MemoryConsensusLog::open_persistent(&path).unwrap();
        let reader = MemoryConsensusLog::open_persistent(&path).unwrap();

        let topic = writer.create_topic(Some("clinic")).await.unwrap();
        writer.submit_message(&topic, b"writer record").await.unwrap();

        let seen = reader.get_message(&topic, 1).await.unwrap().unwrap();
        assert_eq!(BASE64.decode(&seen.message).unwrap(), b"writer record");

        let receipt = reader.submit_message(&topic, b"reader record").await.unwrap();
        assert_eq!(receipt.sequence_number, 2);

        let fresh = MemoryConsensusLog::open_persistent(&path).unwrap();
        let first = fresh.get_message(&topic, 1).await.unwrap().unwrap();
        let second = fresh.get_message(&topic, 2).await.unwrap().unwrap();
        assert_eq!(BASE64.decode(&first.message).unwrap(), b"writer record");
        assert_eq!(BASE64.decode(&second.message).unwrap(), b"reader record");
        assert_eq!(writer.message_count(&topic), Some(2));
        assert_eq!(reader.create_topic(None).await.unwrap(), "0.0.1002");
    }

    #[tokio::test]
    async fn test_concurrent_handles_never_lose_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let topic = MemoryConsensusLog::open_persistent(&path)
            .unwrap()
            .create_topic(None)
            .await
            .unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let log = MemoryConsensusLog::open_persistent(&path).unwrap();
                let topic = topic.clone();
                tokio::spawn(async move {
                    for j in 0..5 {
                        let body = format!("{i}-{j}");
                        log.submit_message(&topic, body.as_bytes()).await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let fresh = MemoryConsensusLog::open_persistent(&path).unwrap();
        assert_eq!(fresh.message_count(&topic), Some(20));
    }

    #[tokio::test]
    async fn test_failed_journal_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let log = MemoryConsensusLog::open_persistent(&path).unwrap();
        let topic = log.create_topic(None).await.unwrap();
        log.submit_message(&topic, b"kept").await.unwrap();

        // A directory where the temp file should go makes the write fail.
        std::fs::create_dir(path.with_extension("tmp")).unwrap();
        let err = log.submit_message(&topic, b"lost").await.unwrap_err();
        assert!(matches!(err, GlowError::LedgerUnavailable(_)));

        std::fs::remove_dir(path.with_extension("tmp")).unwrap();
        assert_eq!(log.message_count(&topic), Some(1));
        let receipt = log.submit_message(&topic, b"next").await.unwrap();
        assert_eq!(receipt.sequence_number, 2);
    }

    #[test]
    fn test_corrupt_journal_is_ledger_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = MemoryConsensusLog::open_persistent(&path).unwrap_err();
        assert!(matches!(err, GlowError::LedgerUnavailable(_)));
        assert!(err.is_ledger_error());
    }

    #[test]
    fn test_format_consensus() {
        assert_eq!(format_consensus(1_700_000_000_000_000_001), "1700000000.000000001");
    }
}
