//! Shared types for the indexing pipeline.

use std::collections::HashSet;

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical address identifier. The core treats it as opaque.
pub type Address = String;

// ─── Transaction ─────────────────────────────────────────────────────────────

/// A value transfer between two addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction hash (`0x…`).
    pub hash: String,
    /// Sender address.
    pub from_address: Address,
    /// Recipient address.
    pub to_address: Address,
    /// Transferred value in the chain's smallest unit, as a decimal string on the wire.
    #[serde(with = "amount")]
    pub amount: U256,
    /// Timestamp of the block that included the transaction.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns `true` if either side of the transfer is in `watchlist`.
    pub fn touches(&self, watchlist: &HashSet<Address>) -> bool {
        watchlist.contains(&self.from_address) || watchlist.contains(&self.to_address)
    }

    /// The distinct watched addresses this transaction should be recorded under.
    pub fn watched_parties<'a>(&'a self, watchlist: &HashSet<Address>) -> Vec<&'a Address> {
        let mut parties = Vec::with_capacity(2);
        if watchlist.contains(&self.from_address) {
            parties.push(&self.from_address);
        }
        if self.to_address != self.from_address && watchlist.contains(&self.to_address) {
            parties.push(&self.to_address);
        }
        parties
    }
}

// ─── Block ───────────────────────────────────────────────────────────────────

/// A block as handed to the core by a block source.
///
/// Only transfers with both endpoints and a defined amount are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block number.
    pub number: u64,
    /// Transactions in block order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(number: u64, transactions: Vec<Transaction>) -> Self {
        Self { number, transactions }
    }

    /// Transactions touching at least one address of `watchlist`, in block order.
    pub fn matching<'a>(
        &'a self,
        watchlist: &'a HashSet<Address>,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions.iter().filter(move |tx| tx.touches(watchlist))
    }
}

// ─── amount (de)serialization ────────────────────────────────────────────────

mod amount {
    use std::str::FromStr;

    use alloy_primitives::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str(&raw).map_err(D::Error::custom)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
