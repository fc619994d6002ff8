//! Indexer configuration and state types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::BackoffConfig;
use crate::store::MAX_TXS_PER_ADDRESS;

/// Configuration for a parser instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// How often to poll the block source for new blocks (milliseconds).
    pub poll_interval_ms: u64,
    /// Transactions retained per watched address.
    pub history_limit: usize,
    /// Retry policy for a failed tick.
    pub backoff: BackoffConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            history_limit: MAX_TXS_PER_ADDRESS,
            backoff: BackoffConfig::default(),
        }
    }
}

impl IndexerConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would make `tokio::time::interval` panic.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Runtime state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexerState {
    /// Waiting for the first chain head to anchor the cursor.
    Bootstrapping,
    /// Scanning new blocks on every tick.
    Polling,
    /// A tick failed and is being retried with backoff.
    Retrying,
    /// Shut down.
    Stopped,
}

impl std::fmt::Display for IndexerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bootstrapping => write!(f, "bootstrapping"),
            Self::Polling => write!(f, "polling"),
            Self::Retrying => write!(f, "retrying"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = IndexerConfig::default();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(10));
        assert_eq!(cfg.history_limit, 100);
        assert_eq!(cfg.backoff.initial_interval_ms, 250);
        assert_eq!(cfg.backoff.max_interval_ms, 30_000);
        assert_eq!(cfg.backoff.max_elapsed_ms, 60_000);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: IndexerConfig =
            serde_json::from_str(r#"{"poll_interval_ms": 500, "backoff": {"multiplier": 2.0}}"#)
                .unwrap();
        assert_eq!(cfg.poll_interval_ms, 500);
        assert_eq!(cfg.backoff.multiplier, 2.0);
        assert_eq!(cfg.backoff.initial_interval_ms, 250);
        assert_eq!(cfg.history_limit, 100);
    }

    #[test]
    fn state_display() {
        assert_eq!(IndexerState::Retrying.to_string(), "retrying");
    }
}
