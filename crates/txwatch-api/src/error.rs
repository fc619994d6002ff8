//! API error type and its JSON rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use txwatch_core::error::SubscriptionError;

use crate::types::ApiResponse;

const VALIDATION_MESSAGE: &str = "Could not validate your request payload";
const INTERNAL_MESSAGE: &str = "An internal error has been happened while processing your request";

/// A single failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub error: String,
}

impl FieldError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not unmarshal request payload")]
    MalformedRequest,

    #[error("Could not validate your request payload")]
    Validation(Vec<FieldError>),

    #[error("address already subscribed")]
    AddressAlreadySubscribed,

    #[error("address not subscribed")]
    AddressNotSubscribed,

    #[error("parser is not ready")]
    NotReady,

    #[error("route not found")]
    RouteNotFound,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::AddressAlreadySubscribed => StatusCode::CONFLICT,
            Self::AddressNotSubscribed | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error type reported in `result.type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest => "MalformedRequest",
            Self::Validation(_) => "ValidationError",
            Self::AddressAlreadySubscribed => "addressAlreadySubscribed",
            Self::AddressNotSubscribed => "addressNotSubscribed",
            Self::NotReady => "notReady",
            Self::RouteNotFound => "routeNotFound",
            Self::Internal(_) => "InternalError",
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::AlreadySubscribed(_) => Self::AddressAlreadySubscribed,
            SubscriptionError::NotSubscribed(_) => Self::AddressNotSubscribed,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => ApiResponse::failure(
                VALIDATION_MESSAGE,
                json!({ "errors": errors, "type": self.kind() }),
            ),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Error occurred in API");
                ApiResponse::failure(INTERNAL_MESSAGE, json!({ "type": self.kind() }))
            }
            other => ApiResponse::failure(other.to_string(), json!({ "type": other.kind() })),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::MalformedRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::AddressAlreadySubscribed.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::AddressNotSubscribed.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NotReady.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn subscription_errors_map_to_api_errors() {
        let err: ApiError = SubscriptionError::AlreadySubscribed("0xabc".into()).into();
        assert_eq!(err.kind(), "addressAlreadySubscribed");
        let err: ApiError = SubscriptionError::NotSubscribed("0xabc".into()).into();
        assert_eq!(err.kind(), "addressNotSubscribed");
    }
}
