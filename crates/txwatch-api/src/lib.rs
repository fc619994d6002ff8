//! txwatch-api — HTTP surface of a txwatch parser.
//!
//! Routes:
//! - `GET    /public/api/v1/block/current`
//! - `POST   /public/api/v1/address/subscribe`
//! - `DELETE /public/api/v1/address/unsubscribe`
//! - `GET    /public/api/v1/address/:address/transactions`
//! - `GET    /-/ready`, `GET /-/live`
//! - `GET    /metrics` (path configurable), Prometheus text format
//!
//! Every response body except the metrics scrape is an [`ApiResponse`] envelope.

mod error;
mod handlers;
mod metrics;
mod types;
mod validation;

pub use error::{ApiError, FieldError};
pub use metrics::{ApiMetrics, METRICS_NAMESPACE};
pub use types::*;
pub use validation::validate_address;

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use txwatch_core::parser::Parser;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub parser: Arc<dyn Parser>,
    pub metrics: Arc<ApiMetrics>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub request_timeout: Duration,
    /// Route serving the Prometheus scrape. Must start with `/`.
    pub metrics_path: String,
    pub metrics_subsystem: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            metrics_path: "/metrics".into(),
            metrics_subsystem: "api".into(),
        }
    }
}

/// Build the application router.
///
/// Fails only if the metrics cannot be registered, e.g. for a subsystem
/// that is not a valid Prometheus name.
pub fn create_router(
    parser: Arc<dyn Parser>,
    config: RouterConfig,
) -> Result<Router, prometheus::Error> {
    let metrics = Arc::new(ApiMetrics::new(
        config.metrics_path.clone(),
        &config.metrics_subsystem,
    )?);

    let v1 = Router::new()
        .route("/block/current", get(handlers::current_block))
        .route("/address/subscribe", post(handlers::subscribe))
        .route("/address/unsubscribe", delete(handlers::unsubscribe))
        .route("/address/:address/transactions", get(handlers::transactions));

    let router = Router::new()
        .nest("/public/api/v1", v1)
        .route("/-/ready", get(handlers::ready))
        .route("/-/live", get(handlers::live))
        .route(&config.metrics_path, get(metrics::render))
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(middleware::from_fn_with_state(
            metrics.clone(),
            metrics::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState { parser, metrics });
    Ok(router)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".into());
    ApiError::Internal(detail).into_response()
}
