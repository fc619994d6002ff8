//! Error types for the txwatch pipeline.

use thiserror::Error;

/// Errors that can occur while scanning blocks.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Block {number} not found")]
    BlockNotFound { number: u64 },

    #[error("Requested block {expected}, source returned block {actual}")]
    UnexpectedBlock { expected: u64, actual: u64 },

    #[error("Could not decode block source response: {0}")]
    Decode(String),

    #[error("Retry budget exhausted after {attempts} attempts: {last_error}")]
    RetryBudgetExhausted { attempts: u32, last_error: String },

    #[error("Indexer aborted: {reason}")]
    Aborted { reason: String },

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Returns `true` if the error is transient and the tick should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Rpc(_)
                | Self::BlockNotFound { .. }
                | Self::UnexpectedBlock { .. }
                | Self::Decode(_)
        )
    }

    /// Returns `true` if the scheduler was asked to stop.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Domain outcomes of subscription management.
///
/// These are never retried; they are reported to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("address {0} already subscribed")]
    AlreadySubscribed(String),

    #[error("address {0} not subscribed")]
    NotSubscribed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(IndexerError::Rpc("connection refused".into()).is_retryable());
        assert!(IndexerError::BlockNotFound { number: 12 }.is_retryable());
        assert!(IndexerError::UnexpectedBlock { expected: 3, actual: 4 }.is_retryable());
    }

    #[test]
    fn abort_is_not_retryable() {
        let err = IndexerError::Aborted { reason: "stop requested".into() };
        assert!(err.is_aborted());
        assert!(!err.is_retryable());
    }
}
