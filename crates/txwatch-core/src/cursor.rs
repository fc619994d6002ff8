//! Block cursor — the last fully indexed block number.

use std::sync::atomic::{AtomicU64, Ordering};

/// The indexer's position in the chain.
///
/// Written only by the scheduler, read by anyone without blocking. The
/// cursor never moves backwards, and it is advanced only after a block's
/// matches are in the store, so a reader that observes block `n` can rely on
/// the store already reflecting it.
#[derive(Debug, Default)]
pub struct BlockCursor {
    block_number: AtomicU64,
}

impl BlockCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last fully indexed block number (0 before the first scan).
    pub fn current(&self) -> u64 {
        self.block_number.load(Ordering::Acquire)
    }

    /// Move the cursor forward to `block_number`. Lower values are ignored.
    /// Returns the resulting position.
    pub fn advance(&self, block_number: u64) -> u64 {
        let previous = self.block_number.fetch_max(block_number, Ordering::AcqRel);
        previous.max(block_number)
    }

    /// Returns the next block to process (cursor + 1).
    pub fn next_block(&self) -> u64 {
        self.current().saturating_add(1)
    }
}
