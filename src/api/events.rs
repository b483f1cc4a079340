//! Event, registration and approval endpoints.

use axum::extract::State;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::access::{authorize, Action};
use crate::db::{ApproveRequest, CreateEventRequest, EventResponse, UpdateEventRequest};
use crate::error::Error;
use crate::lifecycle;
use crate::AppState;

use super::auth::MaybeAuth;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{Json, Path};
use super::metrics;
use super::validation::{validate_email, validate_event_name};

/// PUT /events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Json(request): Json<CreateEventRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize(auth.caller(), &Action::CreateEvent).require(105)?;

    let (Some(name), Some(criteria)) = (request.name, request.criteria) else {
        return Err(Error::malformed(141, "Insufficient Information. Require name, criteria").into());
    };
    let mut errors = ValidationErrorBuilder::new();
    errors.check("name", validate_event_name(&name));
    errors.finish(141)?;

    lifecycle::create_event(&state.db, &name, &criteria, request.details.as_ref()).await?;
    Ok(Json(json!({ "created": true })))
}

/// GET /events
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(auth.caller(), &Action::ListEvents).require(111)?;
    Ok(Json(lifecycle::list_events(&state.db).await?))
}

/// GET /events/:event_name
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
) -> Result<Json<EventResponse>, ApiError> {
    authorize(auth.caller(), &Action::ViewEvent).require(111)?;
    let event = lifecycle::get_event(&state.db, &event_name).await?;
    Ok(Json(EventResponse::from(event)))
}

/// PATCH /events/:event_name. A null or absent field keeps its value.
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.is_empty() {
        return Err(Error::malformed(
            108,
            "Insufficient Information. Empty criteria and details",
        )
        .into());
    }
    authorize(auth.caller(), &Action::UpdateEvent).require(110)?;

    let criteria = request.criteria.as_ref().filter(|v| !v.is_null());
    let details = request.details.as_ref().filter(|v| !v.is_null());
    lifecycle::update_event(&state.db, &event_name, criteria, details).await?;
    Ok(Json(json!({ "updated": true })))
}

/// DELETE /events/:event_name
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    authorize(auth.caller(), &Action::DeleteEvent).require(109)?;
    lifecycle::delete_event(&state.db, &event_name).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// POST /events/:event_name/register. Applies the caller to the event.
pub async fn register(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = auth.require(112)?;
    let email = &session.caller.email;
    authorize(Some(&session.caller), &Action::RegisterForEvent { owner: email }).require(112)?;

    lifecycle::apply_for_event(&state.db, email, &event_name).await?;
    Ok(Json(json!({ "registered": true })))
}

/// GET /events/:event_name/registrations. Pending applications.
pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(auth.caller(), &Action::ListRegistrations).require(113)?;
    Ok(Json(lifecycle::list_registrations(&state.db, &event_name).await?))
}

/// POST /events/:event_name/approve
pub async fn approve(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(email) = request.email.filter(|e| !e.is_empty()) else {
        return Err(Error::malformed(115, "Insufficient Information. Empty email field").into());
    };
    authorize(auth.caller(), &Action::ApproveRegistration).require(114)?;

    let mut errors = ValidationErrorBuilder::new();
    errors.check("email", validate_email(&email));
    errors.finish(115)?;

    lifecycle::approve_registration(&state.db, &event_name, &email).await?;
    metrics::record_approval();
    Ok(Json(json!({ "approved": true })))
}

/// GET /events/:event_name/registered. Approved accounts; public.
pub async fn list_approved(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(event_name): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(auth.caller(), &Action::ListApproved).require(111)?;
    Ok(Json(lifecycle::list_approved(&state.db, &event_name).await?))
}
