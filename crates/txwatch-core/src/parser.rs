//! The parser — query facade over the indexed state, plus the lifecycle of
//! the background scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SubscriptionError;
use crate::indexer::{IndexerConfig, IndexerState};
use crate::scheduler::{Scheduler, SharedState};
use crate::source::BlockSource;
use crate::store::{InMemoryTransactionStore, TransactionStore};
use crate::types::Transaction;

/// Latest transactions of subscribed addresses on a chain.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Last fully indexed block number; 0 before the first successful scan.
    fn current_block_number(&self) -> u64;

    /// Add `address` to the watchlist. Returns `false` if it was already there.
    fn subscribe(&self, address: &str) -> bool;

    /// Remove `address` from the watchlist. Returns `false` if it was not there.
    fn unsubscribe(&self, address: &str) -> bool;

    /// Recorded transactions of `address`, oldest first.
    ///
    /// `None` if the address is not subscribed; an empty list if it is
    /// subscribed but nothing matched yet.
    fn transactions(&self, address: &str) -> Option<Vec<Transaction>>;

    /// Resolves once the initial catch-up scan has completed.
    async fn ready(&self);

    fn is_ready(&self) -> bool;

    /// Current scheduler state.
    fn state(&self) -> IndexerState;

    /// Ask the background scheduler to stop. Safe to call more than once.
    fn stop(&self);

    fn try_subscribe(&self, address: &str) -> Result<(), SubscriptionError> {
        if self.subscribe(address) {
            Ok(())
        } else {
            Err(SubscriptionError::AlreadySubscribed(address.to_string()))
        }
    }

    fn try_unsubscribe(&self, address: &str) -> Result<(), SubscriptionError> {
        if self.unsubscribe(address) {
            Ok(())
        } else {
            Err(SubscriptionError::NotSubscribed(address.to_string()))
        }
    }
}

/// Handle to a running parser.
///
/// Created by [`ParserHandle::start`], which spawns the scheduler on the
/// current tokio runtime.
pub struct ParserHandle {
    shared: SharedState,
    cancel: CancellationToken,
    state: watch::Receiver<IndexerState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ParserHandle {
    /// Start a parser backed by an in-memory store.
    pub fn start<S>(config: IndexerConfig, source: S) -> Self
    where
        S: BlockSource + 'static,
    {
        let store = Arc::new(InMemoryTransactionStore::with_limit(config.history_limit));
        Self::start_with_store(config, source, store)
    }

    /// Start a parser writing into `store`.
    pub fn start_with_store<S>(
        config: IndexerConfig,
        source: S,
        store: Arc<dyn TransactionStore>,
    ) -> Self
    where
        S: BlockSource + 'static,
    {
        let shared = SharedState::new(store);
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(IndexerState::Bootstrapping);

        let scheduler = Scheduler::new(config, source, shared.clone(), cancel.clone(), state_tx);
        let task = tokio::spawn(scheduler.run());

        Self {
            shared,
            cancel,
            state: state_rx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Wait for the background scheduler to exit. Returns immediately if it
    /// was already joined.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Block scheduler task failed");
            }
        }
    }
}

#[async_trait]
impl Parser for ParserHandle {
    fn current_block_number(&self) -> u64 {
        self.shared.cursor.current()
    }

    fn subscribe(&self, address: &str) -> bool {
        let added = self.shared.registry.add(address);
        if added {
            tracing::debug!(address, "Address subscribed");
        }
        added
    }

    fn unsubscribe(&self, address: &str) -> bool {
        let removed = self.shared.registry.remove(address);
        if removed {
            tracing::debug!(address, "Address unsubscribed");
        }
        removed
    }

    fn transactions(&self, address: &str) -> Option<Vec<Transaction>> {
        if !self.shared.registry.contains(address) {
            return None;
        }
        Some(self.shared.store.get(address))
    }

    async fn ready(&self) {
        self.shared.readiness.wait().await
    }

    fn is_ready(&self) -> bool {
        self.shared.readiness.is_ready()
    }

    fn state(&self) -> IndexerState {
        *self.state.borrow()
    }

    fn stop(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Stopping block scheduler");
        }
        self.cancel.cancel();
    }
}
