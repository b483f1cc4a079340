//! Interview scheduling endpoints.

use axum::extract::State;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::access::{authorize, Action, Caller};
use crate::db::{
    CreateInterviewRequest, CreateInterviewResponse, Interview, InterviewResponse,
    UpdateInterviewRequest,
};
use crate::error::Error;
use crate::lifecycle;
use crate::AppState;

use super::auth::MaybeAuth;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{Json, Path};
use super::metrics;
use super::validation::{parse_timestamp, validate_email};

/// Fetch an interview for a caller that must be logged in. Unauthenticated
/// callers are turned away before the lookup so they learn nothing about
/// which interviews exist.
async fn load_interview<'a>(
    state: &AppState,
    auth: &'a MaybeAuth,
    event: &str,
    id: i64,
    code: u16,
) -> Result<(&'a Caller, Interview), ApiError> {
    let Some(caller) = auth.caller() else {
        return Err(Error::not_authorized(code, "Not Logged In").into());
    };
    let interview = lifecycle::get_interview(&state.db, event, id).await?;
    Ok((caller, interview))
}

/// PUT /events/:event_name/interviews
pub async fn create_interview(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
    Json(request): Json<CreateInterviewRequest>,
) -> Result<Json<CreateInterviewResponse>, ApiError> {
    let (Some(interviewer), Some(interviewee), Some(timestamp)) =
        (request.interviewer, request.interviewee, request.timestamp)
    else {
        return Err(Error::malformed(
            116,
            "Insufficient Information. Require interviewer, interviewee, timestamp",
        )
        .into());
    };

    let mut errors = ValidationErrorBuilder::new();
    errors.check("interviewer", validate_email(&interviewer));
    errors.check("interviewee", validate_email(&interviewee));
    if interviewer == interviewee {
        errors.add("interviewee", "Interviewer and interviewee must differ");
    }
    let time = parse_timestamp(&timestamp);
    if let Err(message) = &time {
        errors.add("timestamp", message.clone());
    }
    errors.finish(116)?;
    let time = time.map_err(|m| Error::malformed(116, m))?;

    authorize(
        auth.caller(),
        &Action::CreateInterview {
            interviewer: &interviewer,
        },
    )
    .require(117)?;

    let id = lifecycle::schedule_interview(&state.db, &event_name, &interviewer, &interviewee, time)
        .await?;
    metrics::record_interview_scheduled();

    Ok(Json(CreateInterviewResponse { create: true, id }))
}

/// GET /events/:event_name/interviews
pub async fn list_interviews(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
) -> Result<Json<Vec<InterviewResponse>>, ApiError> {
    authorize(auth.caller(), &Action::ListEventInterviews).require(122)?;
    let interviews = lifecycle::schedule_of_event(&state.db, &event_name).await?;
    Ok(Json(interviews.into_iter().map(InterviewResponse::from).collect()))
}

/// GET /events/:event_name/interviews/:id
pub async fn get_interview(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path((event_name, id)): Path<(String, i64)>,
) -> Result<Json<InterviewResponse>, ApiError> {
    let (caller, interview) = load_interview(&state, &auth, &event_name, id, 121).await?;
    authorize(
        Some(caller),
        &Action::ViewInterview {
            interviewer: &interview.interviewer,
            interviewee: &interview.interviewee,
        },
    )
    .require(121)?;

    Ok(Json(InterviewResponse::from(interview)))
}

/// PATCH /events/:event_name/interviews/:id
pub async fn update_interview(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path((event_name, id)): Path<(String, i64)>,
    Json(request): Json<UpdateInterviewRequest>,
) -> Result<Json<Value>, ApiError> {
    let results = request.results.filter(|r| !r.is_null());
    if request.timestamp.is_none() && results.is_none() {
        return Err(Error::malformed(
            118,
            "Insufficient Information. Missing both timestamp and results",
        )
        .into());
    }
    let mut errors = ValidationErrorBuilder::new();
    let time = match request.timestamp.as_deref().map(parse_timestamp).transpose() {
        Ok(time) => time,
        Err(message) => {
            errors.add("timestamp", message);
            None
        }
    };
    errors.finish(118)?;

    let (caller, interview) = load_interview(&state, &auth, &event_name, id, 119).await?;
    authorize(
        Some(caller),
        &Action::ModifyInterview {
            interviewer: &interview.interviewer,
        },
    )
    .require(119)?;

    lifecycle::record_result(&state.db, &event_name, id, time, results.as_ref()).await?;
    Ok(Json(json!({ "updated": true })))
}

/// DELETE /events/:event_name/interviews/:id
pub async fn delete_interview(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path((event_name, id)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let (caller, interview) = load_interview(&state, &auth, &event_name, id, 123).await?;
    authorize(
        Some(caller),
        &Action::DeleteInterview {
            interviewer: &interview.interviewer,
        },
    )
    .require(123)?;

    lifecycle::delete_interview(&state.db, &event_name, id).await?;
    Ok(Json(json!({ "deleted": true })))
}
