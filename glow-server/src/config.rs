//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Where ledger lookups go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    /// Process-local log, empty at startup.
    Memory,
    /// Local JSON journal shared with `glow --journal`.
    Journal(PathBuf),
    /// Hedera via `HEDERA_*` environment variables.
    Hedera,
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum image size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Emit logs as JSON lines (default: false)
    pub log_json: bool,
    /// Ledger used to resolve proofs
    pub ledger: LedgerBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            log_json: false,
            ledger: LedgerBackend::Memory,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or([127, 0, 0, 1]);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // On by default; RATE_LIMIT_ENABLED=false turns it off
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let log_json = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let ledger = ledger_backend(
            std::env::var("LEDGER_JOURNAL").ok(),
            std::env::var("HEDERA_OPERATOR_ID").ok(),
        );

        Self {
            port: env_parse("PORT", 3000),
            host,
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB", 50),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB", 25),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC", 10),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", 20),
            log_json,
            ledger,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Maximum image upload size in bytes.
    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

/// A journal path wins over Hedera credentials; neither means in-memory.
fn ledger_backend(journal: Option<String>, operator_id: Option<String>) -> LedgerBackend {
    match (journal, operator_id) {
        (Some(path), _) if !path.trim().is_empty() => LedgerBackend::Journal(PathBuf::from(path)),
        (_, Some(id)) if !id.trim().is_empty() => LedgerBackend::Hedera,
        _ => LedgerBackend::Memory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(!config.rate_limit_enabled);
        assert_eq!(config.ledger, LedgerBackend::Memory);
        assert_eq!(config.max_file_size(), 25 * 1024 * 1024);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_ledger_backend_selection() {
        assert_eq!(
            ledger_backend(Some("/var/glow/ledger.json".into()), Some("0.0.42".into())),
            LedgerBackend::Journal(PathBuf::from("/var/glow/ledger.json"))
        );
        assert_eq!(
            ledger_backend(None, Some("0.0.42".into())),
            LedgerBackend::Hedera
        );
        assert_eq!(ledger_backend(Some("  ".into()), None), LedgerBackend::Memory);
        assert_eq!(ledger_backend(None, Some(String::new())), LedgerBackend::Memory);
        assert_eq!(ledger_backend(None, None), LedgerBackend::Memory);
    }
}
