//! Request and response payloads.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use txwatch_core::indexer::IndexerState;
use txwatch_core::types::Transaction;

/// Envelope shared by every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub result: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            message: "OK".into(),
            result,
        }
    }

    pub fn failure(message: impl Into<String>, result: T) -> Self {
        Self {
            success: false,
            message: message.into(),
            result,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

/// Body of the subscribe and unsubscribe routes.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressRequest {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBlock {
    pub last_indexed_block: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liveness {
    pub state: IndexerState,
    pub ready: bool,
    pub last_indexed_block: u64,
}
