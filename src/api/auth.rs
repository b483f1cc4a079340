use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::sync::Arc;

use crate::access::Caller;
use crate::db::{AccountResponse, LoginRequest, LoginResponse};
use crate::error::Error;
use crate::lifecycle;
use crate::live::LiveInterview;
use crate::sessions;
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::Json;
use super::metrics;

pub const SESSION_COOKIE: &str = "interviewd_session";

/// An authenticated request: the login session and who it belongs to
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: String,
    pub caller: Caller,
}

/// Authentication that may be absent. Storage failures while resolving the
/// session are still reported as errors.
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<AuthSession>);

impl MaybeAuth {
    pub fn caller(&self) -> Option<&Caller> {
        self.0.as_ref().map(|session| &session.caller)
    }

    /// The session, or `NotAuthorized` with `code` when there is none
    pub fn require(self, code: u16) -> Result<AuthSession, ApiError> {
        self.0
            .ok_or_else(|| Error::not_authorized(code, "Not Logged In").into())
    }
}

/// Extract the token from the Authorization header or the session cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

async fn resolve_session(state: &AppState, token: &str) -> Result<Option<AuthSession>, Error> {
    let Some(session) = sessions::find_session(&state.db, token).await? else {
        return Ok(None);
    };
    let Some(account) = lifecycle::find_account(&state.db, &session.email).await? else {
        return Ok(None);
    };

    Ok(Some(AuthSession {
        session_id: session.id,
        caller: Caller::new(account.email.clone(), account.role_enum()),
    }))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(&parts.headers) else {
            return Ok(MaybeAuth(None));
        };
        Ok(MaybeAuth(resolve_session(state, &token).await?))
    }
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    if auth.0.is_some() {
        return Err(Error::conflict(104, "Already Logged In").into());
    }

    let mut errors = ValidationErrorBuilder::new();
    if request.email.as_deref().map_or(true, str::is_empty) {
        errors.add("email", "Insufficient Information. Require email, password");
    }
    if request.password.as_deref().map_or(true, str::is_empty) {
        errors.add("password", "Insufficient Information. Require email, password");
    }
    errors.finish(100)?;
    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();

    let Some(account) = lifecycle::authenticate(&state.db, &email, &password).await? else {
        metrics::record_login(false);
        tracing::warn!(email = %email, "Failed login");
        return Err(Error::not_authorized(101, "Invalid credentials").into());
    };

    let ttl = chrono::Duration::hours(state.config.auth.session_ttl_hours);
    let session = sessions::create_session(&state.db, &account.email, ttl).await?;
    metrics::record_login(true);
    tracing::info!(email = %account.email, "Logged in");

    let jar = jar.add(
        Cookie::build((SESSION_COOKIE, session.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    );

    Ok((
        jar,
        Json(LoginResponse {
            authenticated: true,
            token: session.token,
            account: AccountResponse::from(account),
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logout: bool,
}

/// GET /logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), ApiError> {
    let session = auth.require(111)?;

    sessions::delete_session(&state.db, &session.session_id).await?;
    state.live.clear(&session.session_id);
    tracing::info!(email = %session.caller.email, "Logged out");

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    Ok((jar, Json(LogoutResponse { logout: true })))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub account: AccountResponse,
    pub live: LiveInterview,
}

/// GET /session
pub async fn session(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuth,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = auth.require(111)?;
    let account = lifecycle::get_account(&state.db, &session.caller.email).await?;

    Ok(Json(SessionResponse {
        account: AccountResponse::from(account),
        live: state.live.get(&session.session_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Cookie",
            HeaderValue::from_static("theme=dark; interviewd_session=from-cookie"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer header"));
        headers.insert("Cookie", HeaderValue::from_static("interviewd_session=cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(extract_token(&headers).is_none());
    }
}
