//! Live interview endpoints: start, end, language selection and compile.

use axum::extract::State;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::compiler::CompileOutput;
use crate::db::{CompileRequest, SetLanguageRequest};
use crate::error::{Error, ErrorKind};
use crate::lifecycle;
use crate::AppState;

use super::auth::MaybeAuth;
use super::error::ApiError;
use super::extract::{Json, Path};
use super::metrics;
use super::validation::validate_language;

/// POST /events/:event_name/interviews/:id/start
pub async fn start(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path((event_name, id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let session = auth.require(131)?;
    let interview = lifecycle::get_interview(&state.db, &event_name, id).await?;

    state
        .live
        .start(&session.session_id, &session.caller, &interview)?;
    Ok(Json(json!({ "started": true, "event": event_name, "id": id })))
}

/// POST /events/:event_name/interviews/:id/end
pub async fn end(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path((event_name, id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let session = auth.require(131)?;
    state.live.end(&session.session_id, &event_name, id)?;
    Ok(Json(json!({ "ended": true })))
}

/// POST /events/:event_name/interviews/:id/setlang
pub async fn set_language(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path((event_name, id)): Path<(String, i64)>,
    Json(request): Json<SetLanguageRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = auth.require(131)?;

    let language = request
        .language
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .ok_or_else(|| Error::malformed(130, "Insufficient Information. Require language"))?;
    validate_language(&language).map_err(|m| Error::malformed(130, m))?;
    if state.config.compiler.language_id(&language).is_none() {
        return Err(Error::malformed(130, format!("Unsupported language: {}", language)).into());
    }

    state
        .live
        .set_language(&session.session_id, &event_name, id, &language)?;
    Ok(Json(json!({ "language": language })))
}

/// POST /compile. Runs the source in the language of the session's live
/// interview.
pub async fn compile(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Json(request): Json<CompileRequest>,
) -> Result<Json<CompileOutput>, ApiError> {
    let session = auth.require(131)?;
    let language = state.live.compile_language(&session.session_id)?;

    let Some(source) = request.source.filter(|s| !s.is_empty()) else {
        return Err(Error::malformed(134, "Insufficient Information. Require source").into());
    };
    let language_id = state.config.compiler.language_id(&language).ok_or_else(|| {
        Error::NotConfigured(133, format!("No compiler mapping for {}", language))
    })?;

    let result = state
        .compiler
        .compile(language_id, &source, &request.input)
        .await;
    metrics::record_compile(match &result {
        Ok(_) => "ok",
        Err(e) if e.kind() == ErrorKind::Timeout => "timeout",
        Err(_) => "error",
    });

    let output = result?;
    tracing::info!(
        email = %session.caller.email,
        language = %language,
        result = output.result,
        "Compiled submission"
    );
    Ok(Json(output))
}
