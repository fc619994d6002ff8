//! txwatch-core — keeps a bounded history of transactions touching a set of
//! watched addresses, fed by a sequential block scanner.
//!
//! # Architecture
//!
//! ```text
//! ParserHandle::start → Scheduler (background task)
//!                           ├── BlockSource          (chain head + blocks)
//!                           ├── SubscriptionRegistry (watched addresses)
//!                           ├── TransactionStore     (capped per-address history)
//!                           ├── BlockCursor          (last indexed block)
//!                           └── ReadinessGate        (first catch-up scan done)
//! ```

pub mod backoff;
pub mod cursor;
pub mod error;
pub mod indexer;
pub mod parser;
pub mod readiness;
pub mod registry;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod types;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use cursor::BlockCursor;
pub use error::{IndexerError, SubscriptionError};
pub use indexer::{IndexerConfig, IndexerState};
pub use parser::{Parser, ParserHandle};
pub use readiness::ReadinessGate;
pub use registry::SubscriptionRegistry;
pub use source::BlockSource;
pub use store::{InMemoryTransactionStore, TransactionStore, MAX_TXS_PER_ADDRESS};
pub use types::{Address, Block, Transaction};
