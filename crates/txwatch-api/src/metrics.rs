//! Prometheus request metrics and the scrape endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    TEXT_FORMAT,
};

use txwatch_core::parser::Parser;

use crate::error::ApiError;
use crate::ApiState;

pub const METRICS_NAMESPACE: &str = "txwatch";

/// Handler label for paths outside the known route groups.
pub const UNKNOWN_HANDLER: &str = "api-unknown";

pub struct ApiMetrics {
    registry: Registry,
    path: String,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    last_indexed_block: IntGauge,
}

impl ApiMetrics {
    /// Register the API metrics under `txwatch_<subsystem>_*` in a fresh registry.
    /// Requests to `path` itself are not counted.
    pub fn new(path: impl Into<String>, subsystem: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "HTTP requests by handler, method and status code")
                .namespace(METRICS_NAMESPACE)
                .subsystem(subsystem),
            &["handler", "method", "code"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "HTTP request latency")
                .namespace(METRICS_NAMESPACE)
                .subsystem(subsystem),
            &["handler", "method"],
        )?;
        let last_indexed_block = IntGauge::with_opts(
            Opts::new("last_indexed_block", "Last block number processed by the parser")
                .namespace(METRICS_NAMESPACE)
                .subsystem(subsystem),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(last_indexed_block.clone()))?;

        Ok(Self {
            registry,
            path: path.into(),
            requests_total,
            request_duration_seconds,
            last_indexed_block,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn observe(&self, handler: &str, method: &str, status: StatusCode, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[handler, method, status.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[handler, method])
            .observe(elapsed.as_secs_f64());
    }

    fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(buf)
    }
}

/// Route group of a request path, used as the `handler` label.
fn handler_name(path: &str) -> &'static str {
    let Some(rest) = path.strip_prefix("/public/api/v1/") else {
        return match path {
            "/-/ready" => "ready",
            "/-/live" => "live",
            _ => UNKNOWN_HANDLER,
        };
    };
    match rest.split('/').next() {
        Some("block") => "block",
        Some("address") => "address",
        _ => UNKNOWN_HANDLER,
    }
}

/// Middleware counting every request and recording its latency.
pub async fn track_requests(
    State(metrics): State<Arc<ApiMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if path == metrics.path() {
        return next.run(req).await;
    }
    let handler = handler_name(path);
    let method = req.method().clone();

    let started = Instant::now();
    let resp = next.run(req).await;
    metrics.observe(handler, method.as_str(), resp.status(), started.elapsed());
    resp
}

pub async fn render(State(state): State<ApiState>) -> Response {
    let block = i64::try_from(state.parser.current_block_number()).unwrap_or(i64::MAX);
    state.metrics.last_indexed_block.set(block);

    match state.metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            ApiError::Internal(e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_names_follow_route_groups() {
        assert_eq!(handler_name("/public/api/v1/block/current"), "block");
        assert_eq!(handler_name("/public/api/v1/address/subscribe"), "address");
        assert_eq!(handler_name("/public/api/v1/address/0xabc/transactions"), "address");
        assert_eq!(handler_name("/-/ready"), "ready");
        assert_eq!(handler_name("/-/live"), "live");
        assert_eq!(handler_name("/public/api/v1/other"), UNKNOWN_HANDLER);
        assert_eq!(handler_name("/nope"), UNKNOWN_HANDLER);
    }

    #[test]
    fn observed_requests_are_exported() {
        let metrics = ApiMetrics::new("/metrics", "api").unwrap();
        metrics.observe("block", "GET", StatusCode::OK, Duration::from_millis(3));
        metrics.observe("block", "GET", StatusCode::OK, Duration::from_millis(5));

        let text = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(text.contains("# TYPE txwatch_api_requests_total counter"));
        assert!(text.contains("txwatch_api_request_duration_seconds_count"));
        assert!(text
            .lines()
            .any(|l| l.starts_with("txwatch_api_requests_total{") && l.ends_with(" 2")));
    }

    #[test]
    fn invalid_subsystem_is_rejected() {
        assert!(ApiMetrics::new("/metrics", "not-valid").is_err());
    }
}
