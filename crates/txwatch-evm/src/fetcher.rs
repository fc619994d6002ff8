//! EVM block fetcher.
//!
//! Reads the chain head with `eth_blockNumber` and full blocks with
//! `eth_getBlockByNumber(n, true)`, then converts them into core [`Block`]s.
//! Contract creations (`to == null`) and transactions without a `value` are
//! dropped; addresses are lowercased. A malformed transaction (no `hash` or
//! `from`, or an unparsable `value`) is skipped with a warning so it cannot
//! stall the block.

use std::str::FromStr;

use alloy_primitives::U256;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use txwatch_core::error::IndexerError;
use txwatch_core::source::BlockSource;
use txwatch_core::types::{Block, Transaction};

/// Raw JSON-RPC access to an EVM node.
#[async_trait]
pub trait EvmRpcClient: Send + Sync {
    /// Call `method` and return its `result`, `Value::Null` included.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, IndexerError>;
}

/// [`BlockSource`] over an [`EvmRpcClient`].
pub struct EvmFetcher<C> {
    client: C,
}

impl<C: EvmRpcClient> EvmFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: EvmRpcClient> BlockSource for EvmFetcher<C> {
    async fn current_block_number(&self) -> Result<u64, IndexerError> {
        let result = self.client.request("eth_blockNumber", vec![]).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| IndexerError::Decode(format!("eth_blockNumber returned {result}")))?;
        parse_hex_u64(hex)
    }

    async fn block(&self, number: u64) -> Result<Block, IndexerError> {
        let result = self
            .client
            .request("eth_getBlockByNumber", vec![json!(format!("{number:#x}")), json!(true)])
            .await?;
        if result.is_null() {
            return Err(IndexerError::BlockNotFound { number });
        }
        block_from_json(&result)
    }
}

/// Parse a hex-encoded quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, IndexerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| IndexerError::Decode(format!("invalid quantity {s:?}: {e}")))
}

/// Parse a hex-encoded 256-bit quantity. `"0x"` reads as zero.
pub fn parse_hex_u256(s: &str) -> Result<U256, IndexerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str(&format!("0x{digits}"))
        .map_err(|e| IndexerError::Decode(format!("invalid quantity {s:?}: {e}")))
}

/// Convert an `eth_getBlockByNumber` result with full transactions to a [`Block`].
pub fn block_from_json(v: &Value) -> Result<Block, IndexerError> {
    let number = parse_hex_u64(required_str(v, "number")?)?;
    let timestamp = parse_hex_u64(required_str(v, "timestamp")?)?;
    let created_at = i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or_else(|| IndexerError::Decode(format!("block {number}: bad timestamp {timestamp}")))?;

    let raw_txs = match &v["transactions"] {
        Value::Null => &[][..],
        Value::Array(txs) => txs.as_slice(),
        other => {
            return Err(IndexerError::Decode(format!(
                "block {number}: transactions is not an array: {other}"
            )))
        }
    };

    let mut transactions = Vec::with_capacity(raw_txs.len());
    for raw in raw_txs {
        if let Some(tx) = transfer_from_json(number, raw, created_at)? {
            transactions.push(tx);
        }
    }

    Ok(Block::new(number, transactions))
}

fn transfer_from_json(
    block: u64,
    v: &Value,
    created_at: DateTime<Utc>,
) -> Result<Option<Transaction>, IndexerError> {
    if !v.is_object() {
        return Err(IndexerError::Decode(
            "expected full transaction objects, got hashes".into(),
        ));
    }

    let (Some(to), Some(value)) = (v["to"].as_str(), v["value"].as_str()) else {
        return Ok(None);
    };

    let (Some(hash), Some(from)) = (v["hash"].as_str(), v["from"].as_str()) else {
        tracing::warn!(
            block,
            hash = v["hash"].as_str().unwrap_or("<missing>"),
            "Skipping transaction without hash or sender"
        );
        return Ok(None);
    };

    let amount = match parse_hex_u256(value) {
        Ok(amount) => amount,
        Err(e) => {
            tracing::warn!(block, hash, error = %e, "Skipping transaction with bad value");
            return Ok(None);
        }
    };

    Ok(Some(Transaction {
        hash: hash.to_ascii_lowercase(),
        from_address: from.to_ascii_lowercase(),
        to_address: to.to_ascii_lowercase(),
        amount,
        created_at,
    }))
}

fn required_str<'a>(v: &'a Value, field: &str) -> Result<&'a str, IndexerError> {
    v[field]
        .as_str()
        .ok_or_else(|| IndexerError::Decode(format!("missing field `{field}`")))
}
