//! Hedera transport: consensus service writes, mirror node reads.
//!
//! Topics are created and messages submitted through the Hedera SDK with
//! the operator as payer. Reads go straight to the public mirror node REST
//! API.
//!
//! Only reads are retried. A submission that fails is reported, never
//! replayed, so one capture can never be anchored twice.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use chrono::Utc;
use hedera::{TopicCreateTransaction, TopicId, TopicMessageSubmitTransaction};
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use super::config::{AccountId, HederaConfig, Network, OperatorKey};
use super::types::{MirrorMessage, SubmitReceipt};
use super::ConsensusLog;
use crate::error::{GlowError, Result};

const MAX_READ_RETRIES: u32 = 3;
const INITIAL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_INTERVAL: Duration = Duration::from_secs(2);

/// Consensus service client plus mirror node reader.
pub struct HederaConsensusLog {
    client: hedera::Client,
    http: reqwest::Client,
    mirror_url: String,
    timeout: Duration,
}

impl HederaConsensusLog {
    /// Build from validated credentials. Must be called inside a Tokio
    /// runtime.
    #[instrument(level = "debug", skip_all, fields(network = %config.network))]
    pub fn new(
        config: &HederaConfig,
        operator_id: AccountId,
        operator_key: &OperatorKey,
    ) -> Result<Self> {
        let client = match config.network {
            Network::Testnet => hedera::Client::for_testnet(),
            Network::Mainnet => hedera::Client::for_mainnet(),
        };
        let payer = hedera::AccountId::new(operator_id.shard, operator_id.realm, operator_id.num);
        client.set_operator(payer, operator_key.to_sdk_key()?);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                GlowError::LedgerUnavailable(format!("Failed to create HTTP client: {e}"))
            })?;

        info!(
            operator = %operator_id,
            key = %operator_key.algorithm(),
            mirror = config.mirror_url(),
            "Hedera transport ready"
        );

        Ok(Self {
            client,
            http,
            mirror_url: config.mirror_url().to_string(),
            timeout: config.timeout,
        })
    }

    /// One mirror node read.
    async fn fetch_message_once(
        &self,
        url: &str,
    ) -> std::result::Result<Option<MirrorMessage>, backoff::Error<GlowError>> {
        let start = Instant::now();

        let response = self.http.get(url).send().await.map_err(|e| {
            let latency_ms = start.elapsed().as_millis() as u64;
            if is_transient_error(&e) {
                warn!(error = %e, latency_ms, "Transient mirror error, will retry");
                backoff::Error::transient(GlowError::LedgerUnavailable(format!(
                    "Transient error (will retry): {e}"
                )))
            } else {
                warn!(error = %e, latency_ms, "Permanent mirror error, aborting");
                backoff::Error::permanent(GlowError::LedgerUnavailable(format!(
                    "Mirror node request failed: {e}"
                )))
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let err =
                GlowError::LedgerUnavailable(format!("Mirror node returned status: {status}"));
            return if is_transient_status(status) {
                warn!(status = %status, "Transient HTTP status, will retry");
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        let message: MirrorMessage = response.json().await.map_err(|e| {
            backoff::Error::permanent(GlowError::Serialization(format!(
                "Failed to parse mirror node response: {e}"
            )))
        })?;
        debug!(latency_ms = start.elapsed().as_millis() as u64, "Mirror read completed");
        Ok(Some(message))
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: INITIAL_INTERVAL,
            max_interval: MAX_INTERVAL,
            max_elapsed_time: Some(self.timeout.min(MAX_INTERVAL * MAX_READ_RETRIES)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ConsensusLog for HederaConsensusLog {
    #[instrument(level = "debug", skip(self))]
    async fn create_topic(&self, memo: Option<&str>) -> Result<String> {
        let start = Instant::now();
        let mut tx = TopicCreateTransaction::new();
        if let Some(memo) = memo {
            tx.topic_memo(memo);
        }

        let response = tx
            .execute(&self.client)
            .await
            .map_err(|e| map_sdk_error("Topic create", &e))?;
        let receipt = response
            .get_receipt(&self.client)
            .await
            .map_err(|e| map_sdk_error("Topic create receipt", &e))?;

        let topic_id = receipt.topic_id.ok_or_else(|| {
            GlowError::LedgerRejected("Failed to create topic - no topic ID in receipt".into())
        })?;
        info!(
            topic_id = %topic_id,
            latency_ms = start.elapsed().as_millis() as u64,
            "Topic created"
        );
        Ok(topic_id.to_string())
    }

    #[instrument(level = "debug", skip(self, message), fields(bytes = message.len()))]
    async fn submit_message(&self, topic_id: &str, message: &[u8]) -> Result<SubmitReceipt> {
        let topic: TopicId = topic_id.parse().map_err(|e| {
            GlowError::InvalidConfig(format!("Invalid topic id '{topic_id}': {e}"))
        })?;
        let start = Instant::now();

        let mut tx = TopicMessageSubmitTransaction::new();
        tx.topic_id(topic).message(message.to_vec());

        let response = tx
            .execute(&self.client)
            .await
            .map_err(|e| map_sdk_error("Message submit", &e))?;
        let receipt = response
            .get_receipt(&self.client)
            .await
            .map_err(|e| map_sdk_error("Message submit receipt", &e))?;

        // The exact consensus time is served by the mirror node once the
        // message propagates; the receipt carries only the sequence number.
        let consensus_timestamp = approximate_consensus_timestamp();
        debug!(
            sequence = receipt.topic_sequence_number,
            latency_ms = start.elapsed().as_millis() as u64,
            "Message reached consensus"
        );

        Ok(SubmitReceipt {
            transaction_id: response.transaction_id.to_string(),
            consensus_timestamp,
            sequence_number: receipt.topic_sequence_number,
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_message(
        &self,
        topic_id: &str,
        sequence_number: u64,
    ) -> Result<Option<MirrorMessage>> {
        let url = format!(
            "{}/api/v1/topics/{topic_id}/messages/{sequence_number}",
            self.mirror_url
        );

        retry_notify(
            self.build_backoff(),
            || async { self.fetch_message_once(&url).await },
            |err: GlowError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    fn name(&self) -> &'static str {
        "hedera"
    }
}

/// Classify an SDK failure. Status errors mean the network answered and
/// refused; anything else means it could not be reached.
fn map_sdk_error(operation: &str, error: &hedera::Error) -> GlowError {
    warn!(operation, error = %error, "Hedera request failed");
    match error {
        hedera::Error::TransactionPreCheckStatus { .. }
        | hedera::Error::QueryPreCheckStatus { .. }
        | hedera::Error::ReceiptStatus { .. } => {
            GlowError::LedgerRejected(format!("{operation} rejected: {error}"))
        }
        _ => GlowError::LedgerUnavailable(format!("{operation} failed: {error}")),
    }
}

/// Local wall clock in mirror node `seconds.nanoseconds` form.
fn approximate_consensus_timestamp() -> String {
    let now = Utc::now();
    format!("{}.{:09}", now.timestamp(), now.timestamp_subsec_nanos())
}

/// Whether a reqwest error is worth retrying.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Whether an HTTP status indicates a transient failure.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_codes() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_approximate_timestamp_has_mirror_shape() {
        let stamp = approximate_consensus_timestamp();
        let (secs, nanos) = stamp.split_once('.').unwrap();
        assert!(secs.parse::<i64>().unwrap() > 1_600_000_000);
        assert_eq!(nanos.len(), 9);
        assert!(nanos.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_sdk_accepts_both_key_algorithms() {
        let ed = OperatorKey::parse(
            "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
        )
        .unwrap();
        let ecdsa = OperatorKey::parse(
            "0xb430153530c6db9d5ceb349bcbf7a8ceca6ff22af74df7aa0bd2324c1d44d500",
        )
        .unwrap();
        assert!(ed.to_sdk_key().is_ok());
        assert!(ecdsa.to_sdk_key().is_ok());
    }

    #[tokio::test]
    async fn test_transport_builds_for_ecdsa_operator() {
        let config = HederaConfig {
            operator_id: "0.0.2".into(),
            operator_key: "0xb430153530c6db9d5ceb349bcbf7a8ceca6ff22af74df7aa0bd2324c1d44d500"
                .into(),
            mirror_url: Some("http://localhost:5551/".into()),
            ..Default::default()
        };
        let (id, key) = config.credentials().unwrap();
        let log = HederaConsensusLog::new(&config, id, &key).unwrap();
        assert_eq!(log.mirror_url, "http://localhost:5551");
        assert_eq!(log.name(), "hedera");
    }
}
