//! The `BlockSource` trait — where the scheduler reads blocks from.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::types::Block;

/// Read access to a chain.
///
/// Implementations own their transport, timeouts and cancellation
/// behaviour; the scheduler never interrupts an in-flight call. Blocks must
/// only contain transfers with both endpoints and a defined amount.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Current chain head.
    async fn current_block_number(&self) -> Result<u64, IndexerError>;

    /// Fetch block `number`. Returns [`IndexerError::BlockNotFound`] if the
    /// source does not have it (yet).
    async fn block(&self, number: u64) -> Result<Block, IndexerError>;
}

#[async_trait]
impl<S: BlockSource + ?Sized> BlockSource for Arc<S> {
    async fn current_block_number(&self) -> Result<u64, IndexerError> {
        (**self).current_block_number().await
    }

    async fn block(&self, number: u64) -> Result<Block, IndexerError> {
        (**self).block(number).await
    }
}
