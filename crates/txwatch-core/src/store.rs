//! Transaction store — bounded per-address transaction history.
//!
//! Each address keeps a sliding window of its most recent transactions
//! (oldest first). When a new entry would exceed the limit, the oldest
//! entries are dropped.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

use crate::types::{Address, Transaction};

/// Number of transactions retained per address.
pub const MAX_TXS_PER_ADDRESS: usize = 100;

/// Storage backend for per-address transaction history.
///
/// The store has no notion of subscriptions: `get` on an address that never
/// matched returns an empty history.
pub trait TransactionStore: Send + Sync {
    /// Append `tx` to the tail of `address`'s history, evicting from the head
    /// if the history would exceed the limit.
    fn append(&self, address: &str, tx: Transaction);

    /// Append a block's worth of matches, in order.
    fn append_batch(&self, batch: Vec<(Address, Transaction)>) {
        for (address, tx) in batch {
            self.append(&address, tx);
        }
    }

    /// Current history for `address`, oldest first.
    fn get(&self, address: &str) -> Vec<Transaction>;
}

/// In-memory transaction store.
///
/// All data is lost when the process exits.
pub struct InMemoryTransactionStore {
    histories: RwLock<HashMap<Address, VecDeque<Transaction>>>,
    limit: usize,
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::with_limit(MAX_TXS_PER_ADDRESS)
    }
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store retaining at most `limit` transactions per address,
    /// clamped to `1..=MAX_TXS_PER_ADDRESS`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            histories: RwLock::new(HashMap::new()),
            limit: limit.clamp(1, MAX_TXS_PER_ADDRESS),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of addresses with at least one recorded transaction.
    pub fn address_count(&self) -> usize {
        self.histories.read().len()
    }

    fn push(limit: usize, history: &mut VecDeque<Transaction>, tx: Transaction) {
        history.push_back(tx);
        while history.len() > limit {
            history.pop_front();
        }
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn append(&self, address: &str, tx: Transaction) {
        let mut histories = self.histories.write();
        let history = histories.entry(address.to_string()).or_default();
        Self::push(self.limit, history, tx);
    }

    fn append_batch(&self, batch: Vec<(Address, Transaction)>) {
        if batch.is_empty() {
            return;
        }
        let mut histories = self.histories.write();
        for (address, tx) in batch {
            let history = histories.entry(address).or_default();
            Self::push(self.limit, history, tx);
        }
    }

    fn get(&self, address: &str) -> Vec<Transaction> {
        self.histories
            .read()
            .get(address)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }
}
