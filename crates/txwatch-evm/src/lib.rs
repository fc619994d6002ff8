//! txwatch-evm — EVM JSON-RPC block source and parser builder.

pub mod builder;
pub mod client;
pub mod fetcher;
pub mod request;

pub use builder::{EvmIndexerBuilder, DEFAULT_RPC_URL};
pub use client::HttpRpcClient;
pub use fetcher::{block_from_json, EvmFetcher, EvmRpcClient};
