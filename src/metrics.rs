//! Prometheus metrics: HTTP request instrumentation and the catalog gauge.

use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const BOOKS_TOTAL: &str = "books_total";

const REQUEST_DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0];

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder.
///
/// Safe to call more than once; later calls return the first handle.
///
/// # Panics
///
/// Panics if the recorder cannot be installed. The server does not start
/// without metrics.
#[allow(clippy::panic)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .set_buckets_for_metric(
                    Matcher::Full(HTTP_REQUEST_DURATION.to_string()),
                    REQUEST_DURATION_BUCKETS,
                )
                .and_then(|builder| builder.install_recorder())
                .unwrap_or_else(|e| panic!("failed to install prometheus recorder: {e}"));

            describe_histogram!(HTTP_REQUEST_DURATION, "Duration of HTTP requests in seconds");
            describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
            describe_gauge!(BOOKS_TOTAL, "Total number of books in the library");

            tracing::info!("Prometheus metrics recorder initialized");
            handle
        })
        .clone()
}

pub fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

/// Route label: the matched path template, or the raw path when unmatched
fn route_label(request: &Request) -> String {
    request.extensions().get::<MatchedPath>().map_or_else(
        || request.uri().path().to_string(),
        |path| path.as_str().to_string(),
    )
}

/// Records duration and count of every request
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = route_label(&request);
    let method = request.method().to_string();

    let response = next.run(request).await;

    let labels = [
        ("method", method),
        ("route", route),
        ("status_code", response.status().as_u16().to_string()),
    ];
    histogram!(HTTP_REQUEST_DURATION, &labels).record(start.elapsed().as_secs_f64());
    counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);

    response
}

/// `GET /metrics`
pub async fn serve_metrics() -> Response {
    match prometheus_handle() {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => {
            tracing::error!("Metrics endpoint called before recorder initialization");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({ "error": "Metrics unavailable" })),
            )
                .into_response()
        }
    }
}

pub fn record_books_total(count: usize) {
    gauge!(BOOKS_TOTAL).set(count as f64);
}
