//! The scheduler — the background loop that keeps the store up to date.
//!
//! # Bootstrapping
//! Read the chain head once and anchor the cursor there. No historical block
//! is processed: only blocks produced after start are indexed.
//!
//! # Polling
//! On every timer tick, walk `(cursor, head]` in order. For each block:
//!   - snapshot the registry
//!   - keep transfers touching a watched address
//!   - append them to the store
//!   - advance the cursor to the block
//!
//! # Retrying
//! A failed tick is retried with exponential backoff until it succeeds, the
//! budget runs out (the error is logged and the next tick picks up where the
//! cursor stands) or a stop is requested.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backoff::ExponentialBackoff;
use crate::cursor::BlockCursor;
use crate::error::IndexerError;
use crate::indexer::{IndexerConfig, IndexerState};
use crate::readiness::ReadinessGate;
use crate::registry::SubscriptionRegistry;
use crate::source::BlockSource;
use crate::store::TransactionStore;
use crate::types::{Address, Block, Transaction};

/// State shared between the scheduler and the query path.
#[derive(Clone)]
pub struct SharedState {
    pub registry: Arc<SubscriptionRegistry>,
    pub store: Arc<dyn TransactionStore>,
    pub cursor: Arc<BlockCursor>,
    pub readiness: Arc<ReadinessGate>,
}

impl SharedState {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self {
            registry: Arc::new(SubscriptionRegistry::new()),
            store,
            cursor: Arc::new(BlockCursor::new()),
            readiness: Arc::new(ReadinessGate::new()),
        }
    }
}

/// Sequential block scanner.
pub struct Scheduler<S: BlockSource> {
    config: IndexerConfig,
    source: S,
    shared: SharedState,
    cancel: CancellationToken,
    state: watch::Sender<IndexerState>,
    bootstrapped: bool,
}

impl<S: BlockSource> Scheduler<S> {
    pub fn new(
        config: IndexerConfig,
        source: S,
        shared: SharedState,
        cancel: CancellationToken,
        state: watch::Sender<IndexerState>,
    ) -> Self {
        state.send_replace(IndexerState::Bootstrapping);
        Self {
            config,
            source,
            shared,
            cancel,
            state,
            bootstrapped: false,
        }
    }

    /// Run until cancelled.
    pub async fn run(mut self) {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Starting block scheduler"
        );

        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately: a single attempt, no backoff.
        let mut first = true;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = if first {
                first = false;
                self.tick().await
            } else {
                self.tick_with_retry().await
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is_aborted() => break,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        cursor = self.shared.cursor.current(),
                        "Could not scan blocks, waiting for next tick"
                    );
                }
            }
        }

        self.set_state(IndexerState::Stopped);
        tracing::info!(cursor = self.shared.cursor.current(), "Block scheduler stopped");
    }

    /// One scheduled attempt: bootstrap if still needed, otherwise scan.
    async fn tick(&mut self) -> Result<(), IndexerError> {
        if self.bootstrapped {
            self.scan().await?;
        } else {
            self.bootstrap().await?;
        }

        if self.shared.readiness.mark_ready() {
            tracing::info!(
                block = self.shared.cursor.current(),
                "Initial catch-up scan complete"
            );
        }
        Ok(())
    }

    async fn tick_with_retry(&mut self) -> Result<(), IndexerError> {
        let mut backoff = ExponentialBackoff::new(self.config.backoff.clone());
        loop {
            let err = match self.tick().await {
                Ok(()) => {
                    self.set_state(self.resting_state());
                    return Ok(());
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                self.set_state(self.resting_state());
                return Err(err);
            }

            let Some(delay) = backoff.next_backoff() else {
                self.set_state(self.resting_state());
                return Err(IndexerError::RetryBudgetExhausted {
                    attempts: backoff.attempts(),
                    last_error: err.to_string(),
                });
            };

            self.set_state(IndexerState::Retrying);
            tracing::warn!(
                attempt = backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Block scan failed, retrying"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(IndexerError::Aborted {
                        reason: "stop requested during backoff".into(),
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn bootstrap(&mut self) -> Result<(), IndexerError> {
        let head = self.source.current_block_number().await?;
        self.shared.cursor.advance(head);
        self.bootstrapped = true;
        self.set_state(IndexerState::Polling);
        tracing::info!(head, "Anchored cursor at chain head");
        Ok(())
    }

    /// Index every block in `(cursor, head]`. Returns the number of blocks processed.
    async fn scan(&mut self) -> Result<u64, IndexerError> {
        let head = self.source.current_block_number().await?;
        let from = self.shared.cursor.next_block();
        if from > head {
            tracing::debug!(head, "No new blocks");
            return Ok(0);
        }

        for number in from..=head {
            if self.cancel.is_cancelled() {
                return Err(IndexerError::Aborted {
                    reason: "stop requested".into(),
                });
            }

            tracing::debug!(block = number, head, "Indexing block");
            let block = self.source.block(number).await?;
            if block.number != number {
                return Err(IndexerError::UnexpectedBlock {
                    expected: number,
                    actual: block.number,
                });
            }
            self.process_block(&block);
        }

        tracing::info!(from, to = head, "Scan complete");
        Ok(head - from + 1)
    }

    /// Store the block's matches, then advance the cursor past it.
    fn process_block(&self, block: &Block) -> usize {
        let watchlist = self.shared.registry.snapshot();

        let mut batch: Vec<(Address, Transaction)> = Vec::new();
        for tx in block.matching(&watchlist) {
            for party in tx.watched_parties(&watchlist) {
                batch.push((party.clone(), tx.clone()));
            }
        }

        let matched = batch.len();
        self.shared.store.append_batch(batch);
        self.shared.cursor.advance(block.number);

        tracing::debug!(
            block = block.number,
            txs = block.transactions.len(),
            matched,
            "Block indexed"
        );
        matched
    }

    fn resting_state(&self) -> IndexerState {
        if self.bootstrapped {
            IndexerState::Polling
        } else {
            IndexerState::Bootstrapping
        }
    }

    fn set_state(&self, state: IndexerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Scheduler state changed");
        }
    }
}
