//! Public system endpoints.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::access::{authorize, Action};
use crate::AppState;

use super::auth::MaybeAuth;
use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct TimeResponse {
    /// RFC 3339, UTC
    pub time: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// GET /time
pub async fn current_time(auth: MaybeAuth) -> Result<Json<TimeResponse>, ApiError> {
    authorize(auth.caller(), &Action::ViewTime).require(111)?;
    let now = Utc::now();
    Ok(Json(TimeResponse {
        time: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        timestamp: now.timestamp_millis(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    pub live_interviews: usize,
}

/// GET /health. Reports 503 when the database does not answer.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let database = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database,
            live_interviews: state.live.len(),
        }),
    )
}
