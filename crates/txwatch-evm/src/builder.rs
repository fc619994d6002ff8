//! Fluent builder API for EVM parsers.
//!
//! # Example
//!
//! ```rust,no_run
//! use txwatch_core::Parser;
//! use txwatch_evm::EvmIndexerBuilder;
//!
//! # async fn run() -> Result<(), txwatch_core::IndexerError> {
//! let parser = EvmIndexerBuilder::new()
//!     .rpc_url("https://ethereum-rpc.publicnode.com")
//!     .poll_interval_ms(12_000)
//!     .start()?;
//!
//! parser.subscribe("0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
//! parser.ready().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use txwatch_core::backoff::BackoffConfig;
use txwatch_core::error::IndexerError;
use txwatch_core::indexer::IndexerConfig;
use txwatch_core::parser::ParserHandle;

use crate::client::{HttpRpcClient, DEFAULT_REQUEST_TIMEOUT};
use crate::fetcher::EvmFetcher;

/// Default JSON-RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Fluent builder for an EVM-backed [`ParserHandle`].
#[derive(Debug, Clone)]
pub struct EvmIndexerBuilder {
    rpc_url: String,
    request_timeout: Duration,
    config: IndexerConfig,
}

impl Default for EvmIndexerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EvmIndexerBuilder {
    pub fn new() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            config: IndexerConfig::default(),
        }
    }

    /// Set the JSON-RPC endpoint.
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    /// Set the per-request timeout in milliseconds.
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout = Duration::from_millis(ms);
        self
    }

    /// Set the polling interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the number of transactions kept per address (capped at 100).
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    /// Set the retry policy for failed ticks.
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Replace the whole indexer configuration.
    pub fn config(mut self, config: IndexerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the `IndexerConfig`.
    pub fn build_config(&self) -> IndexerConfig {
        self.config.clone()
    }

    /// Build the block source without starting anything.
    pub fn build_source(&self) -> Result<EvmFetcher<HttpRpcClient>, IndexerError> {
        if self.rpc_url.trim().is_empty() {
            return Err(IndexerError::Other("RPC URL must not be empty".into()));
        }
        let client = HttpRpcClient::new(self.rpc_url.clone(), self.request_timeout)?;
        Ok(EvmFetcher::new(client))
    }

    /// Start the parser on the current tokio runtime.
    pub fn start(self) -> Result<ParserHandle, IndexerError> {
        let source = self.build_source()?;
        tracing::info!(
            rpc_url = %self.rpc_url,
            request_timeout_ms = self.request_timeout.as_millis() as u64,
            "Starting EVM parser"
        );
        Ok(ParserHandle::start(self.config, source))
    }
}
