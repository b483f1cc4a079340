//! HTTP rendering of errors.
//!
//! Every error leaves the service as
//! `{"error": {"code": "<kind>", "message": "NNN: text", "details": ...}}`.
//! Internal failures carry a diagnostic that is only rendered when the
//! [`expose_diagnostics`] middleware is installed (development mode).

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, ErrorKind};

/// Error codes for API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MalformedInput,
    ValidationError,
    NotAuthorized,
    NotFound,
    Conflict,
    NotEligible,
    NotInProgress,
    NotConfigured,
    Timeout,
    CompilerError,
    InternalError,
    DatabaseError,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MalformedInput
            | ErrorCode::ValidationError
            | ErrorCode::Conflict
            | ErrorCode::NotEligible
            | ErrorCode::NotInProgress
            | ErrorCode::NotConfigured => StatusCode::BAD_REQUEST,
            ErrorCode::NotAuthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::CompilerError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MalformedInput => "malformed_input",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotAuthorized => "not_authorized",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::NotEligible => "not_eligible",
            ErrorCode::NotInProgress => "not_in_progress",
            ErrorCode::NotConfigured => "not_configured",
            ErrorCode::Timeout => "timeout",
            ErrorCode::CompilerError => "compiler_error",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::DatabaseError => "database_error",
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::MalformedInput => ErrorCode::MalformedInput,
            ErrorKind::NotAuthorized => ErrorCode::NotAuthorized,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::NotEligible => ErrorCode::NotEligible,
            ErrorKind::NotInProgress => ErrorCode::NotInProgress,
            ErrorKind::NotConfigured => ErrorCode::NotConfigured,
            ErrorKind::Timeout => ErrorCode::Timeout,
            ErrorKind::Compiler => ErrorCode::CompilerError,
            ErrorKind::Internal => ErrorCode::InternalError,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    /// Field-level validation errors
    ValidationErrors(HashMap<String, Vec<String>>),
    Generic(HashMap<String, serde_json::Value>),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Internal detail attached to a response for [`expose_diagnostics`]
#[derive(Debug, Clone)]
pub struct Diagnostic(pub String);

#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    status: StatusCode,
    message: String,
    details: Option<ErrorDetails>,
    diagnostic: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: code.status_code(),
            code,
            message: message.into(),
            details: None,
            diagnostic: None,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Validation error (400) with field-level details. `code` is the
    /// numeric prefix of the message.
    pub fn validation(code: u16, errors: HashMap<String, Vec<String>>) -> Self {
        let text = if errors.len() == 1 {
            errors
                .values()
                .next()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_else(|| "Insufficient Information".to_string())
        } else {
            format!("Insufficient Information. {} invalid fields", errors.len())
        };

        Self::new(ErrorCode::ValidationError, format!("{:03}: {}", code, text))
            .with_details(ErrorDetails::ValidationErrors(errors))
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = ErrorCode::from(err.kind());
        match &err {
            Error::Database(db_err) => {
                tracing::error!(error = %db_err, "Database error");
                ApiError::new(ErrorCode::DatabaseError, "009: Storage failure")
                    .with_diagnostic(err.to_string())
            }
            Error::Credential(..) => {
                tracing::error!(error = %err, "Credential error");
                ApiError::new(code, err.to_string()).with_diagnostic(err.to_string())
            }
            Error::Compiler(..) | Error::Timeout(..) => {
                tracing::warn!(error = %err, "Compiler request failed");
                ApiError::new(code, err.to_string())
            }
            _ => ApiError::new(code, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code.as_str().to_string(),
                message: self.message,
                details: self.details,
            },
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(diagnostic) = self.diagnostic {
            response.extensions_mut().insert(Diagnostic(diagnostic));
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

/// Upper bound for re-reading an error body
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Development-only middleware: copy the [`Diagnostic`] of an error
/// response into its `details`.
pub async fn expose_diagnostics(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(Diagnostic(diagnostic)) = response.extensions().get::<Diagnostic>().cloned() else {
        return response;
    };

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read error body");
            return (parts.status, "Failed to read error body").into_response();
        }
    };

    match serde_json::from_slice::<ErrorResponse>(&bytes) {
        Ok(mut error) => {
            let mut details = HashMap::new();
            details.insert("diagnostic".to_string(), serde_json::Value::String(diagnostic));
            error.error.details = Some(ErrorDetails::Generic(details));
            (parts.status, Json(error)).into_response()
        }
        Err(_) => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the error of a field check, if any
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn build(self, code: u16) -> Option<ApiError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(ApiError::validation(code, self.errors))
        }
    }

    /// Ok(()) if nothing was collected
    pub fn finish(self, code: u16) -> Result<(), ApiError> {
        match self.build(code) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
