//! Account endpoints.

use axum::extract::State;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::access::{authorize, Action};
use crate::crypto::{generate_temporary_password, hash_password};
use crate::db::{
    AccountResponse, ChangePasswordRequest, CreateAccountRequest, InterviewResponse,
    ResetPasswordResponse,
};
use crate::error::Error;
use crate::lifecycle;
use crate::sessions;
use crate::AppState;

use super::auth::MaybeAuth;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{Json, Path};
use super::validation::{parse_role, validate_email, validate_password};

/// Keys of a `PATCH /users/:email` body that are not free-form details
const RESERVED_KEYS: [&str; 4] = ["email", "password", "password_hash", "role"];

fn hash(password: &str) -> Result<String, Error> {
    hash_password(password)
        .map_err(|e| Error::Credential(14, format!("Failed to hash password: {}", e)))
}

/// PUT /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    let role_text = request.role.unwrap_or_default();

    if email.is_empty() || password.is_empty() || role_text.is_empty() {
        return Err(Error::malformed(
            102,
            "Insufficient Information. Require email, password, role",
        )
        .into());
    }

    let mut errors = ValidationErrorBuilder::new();
    errors.check("email", validate_email(&email));
    errors.check("password", validate_password(&password));
    let role = parse_role(&role_text);
    if let Err(message) = &role {
        errors.add("role", message.clone());
    }
    errors.finish(102)?;
    let role = role.map_err(|m| Error::malformed(102, m))?;

    authorize(auth.caller(), &Action::CreateAccount { role }).require(103)?;

    let password_hash = hash(&password)?;
    lifecycle::create_account(&state.db, &email, &password_hash, role, &request.details).await?;

    Ok(Json(json!({ "created": true })))
}

/// GET /users/:email
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(email): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    authorize(auth.caller(), &Action::ViewAccount { owner: &email }).require(128)?;
    let account = lifecycle::get_account(&state.db, &email).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// PATCH /users/:email. Merges the body into the account details.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(email): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    if body.is_empty() {
        return Err(Error::malformed(107, "Insufficient Information. Empty body").into());
    }
    authorize(auth.caller(), &Action::UpdateAccount { owner: &email }).require(106)?;

    let mut errors = ValidationErrorBuilder::new();
    for key in RESERVED_KEYS.iter().filter(|k| body.contains_key(**k)) {
        errors.add(*key, format!("{} cannot be changed here", key));
    }
    errors.finish(107)?;

    let account = lifecycle::get_account(&state.db, &email).await?;
    let mut details = match AccountResponse::from(account).details {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    details.extend(body);
    lifecycle::update_account_details(&state.db, &email, &details).await?;

    Ok(Json(json!({ "updated": true })))
}

/// POST /users/:email/changepwd
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(email): Path<String>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize(auth.caller(), &Action::ChangePassword { owner: &email }).require(124)?;

    let (Some(old_password), Some(new_password)) = (request.old_password, request.new_password)
    else {
        return Err(Error::malformed(
            125,
            "Insufficient Information. Require old_password, new_password",
        )
        .into());
    };
    let mut errors = ValidationErrorBuilder::new();
    errors.check("new_password", validate_password(&new_password));
    errors.finish(125)?;

    if lifecycle::authenticate(&state.db, &email, &old_password).await?.is_none() {
        return Err(Error::not_authorized(101, "Invalid credentials").into());
    }
    lifecycle::set_password(&state.db, &email, &hash(&new_password)?).await?;
    tracing::info!(email = %email, "Password changed");

    Ok(Json(json!({ "updated": true })))
}

/// POST /users/:email/resetpwd. Issues a temporary password and ends every
/// session of the account.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(email): Path<String>,
) -> Result<Json<ResetPasswordResponse>, ApiError> {
    authorize(auth.caller(), &Action::ResetPassword { owner: &email }).require(126)?;

    lifecycle::get_account(&state.db, &email).await?;
    let temporary_password = generate_temporary_password();
    lifecycle::set_password(&state.db, &email, &hash(&temporary_password)?).await?;

    for session_id in sessions::delete_sessions_for(&state.db, &email).await? {
        state.live.clear(&session_id);
    }
    tracing::info!(email = %email, "Password reset by admin");

    Ok(Json(ResetPasswordResponse {
        reset: true,
        temporary_password,
    }))
}

/// GET /users/:email/interviews
pub async fn user_interviews(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(email): Path<String>,
) -> Result<Json<Vec<InterviewResponse>>, ApiError> {
    authorize(auth.caller(), &Action::ViewSchedule { owner: &email }).require(120)?;
    let interviews = lifecycle::schedule_of_user(&state.db, &email).await?;
    Ok(Json(interviews.into_iter().map(InterviewResponse::from).collect()))
}

/// GET /users/:email/events/notregistered
pub async fn events_not_registered(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(email): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(auth.caller(), &Action::ViewEnrollment { owner: &email }).require(127)?;
    Ok(Json(lifecycle::events_not_registered(&state.db, &email).await?))
}

/// GET /users/:email/events/registered
pub async fn events_registered(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(email): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(auth.caller(), &Action::ViewEnrollment { owner: &email }).require(127)?;
    Ok(Json(lifecycle::events_registered(&state.db, &email).await?))
}

/// GET /users/:email/events/approved
pub async fn events_approved(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    Path(email): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    authorize(auth.caller(), &Action::ViewEnrollment { owner: &email }).require(127)?;
    Ok(Json(lifecycle::events_approved(&state.db, &email).await?))
}
