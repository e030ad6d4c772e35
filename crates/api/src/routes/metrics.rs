//! Prometheus metrics endpoint.
//!
//! Renders the counters recorded across the sourcing workflow (RFP
//! publications and closes, quote admissions and rejections, notification
//! deliveries and failures) in the Prometheus text exposition format.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics — scrape endpoint for the recorded counters.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    let body = handle.render();
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}
