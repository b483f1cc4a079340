//! Prometheus metrics endpoint and HTTP request tracking middleware.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const LOGINS_TOTAL: &str = "logins_total";
pub const APPROVALS_TOTAL: &str = "approvals_total";
pub const INTERVIEWS_SCHEDULED_TOTAL: &str = "interviews_scheduled_total";
pub const COMPILES_TOTAL: &str = "compiles_total";
pub const LIVE_INTERVIEWS: &str = "live_interviews";

/// Install the global Prometheus recorder. Call once at start-up.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request duration in seconds");
    describe_counter!(LOGINS_TOTAL, "Login attempts by outcome (success/failed)");
    describe_counter!(APPROVALS_TOTAL, "Registrations approved");
    describe_counter!(INTERVIEWS_SCHEDULED_TOTAL, "Interviews scheduled");
    describe_counter!(COMPILES_TOTAL, "Compile requests by outcome (ok/timeout/error)");
    describe_gauge!(LIVE_INTERVIEWS, "Sessions currently inside a live interview");

    Ok(handle)
}

/// GET /metrics
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    gauge!(LIVE_INTERVIEWS).set(state.live.len() as f64);

    match state.metrics_handle.as_ref() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Records `http_requests_total` and `http_request_duration_seconds`,
/// labelled with the matched route template rather than the raw path.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failed" };
    counter!(LOGINS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_approval() {
    counter!(APPROVALS_TOTAL).increment(1);
}

pub fn record_interview_scheduled() {
    counter!(INTERVIEWS_SCHEDULED_TOTAL).increment(1);
}

pub fn record_compile(outcome: &'static str) {
    counter!(COMPILES_TOTAL, "outcome" => outcome).increment(1);
}
