//! `Json` and `Path` extractors whose rejections render as [`ApiError`].
//!
//! axum's own extractors answer a bad body or path segment with plain text.
//! These wrap them so every failure carries the JSON error envelope.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::{request::Parts, Uri},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;

use super::error::ApiError;

/// Request body could not be read as the expected JSON
pub const MALFORMED_BODY: u16 = 142;
/// A path segment did not parse (e.g. a non-numeric interview id)
pub const MALFORMED_PATH: u16 = 143;
/// No route matches the request
pub const UNKNOWN_ROUTE: u16 = 144;

/// JSON request body and response
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Json(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Typed path parameters
#[derive(Debug)]
pub struct Path<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Path(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Error::malformed(MALFORMED_BODY, rejection.body_text()).into()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Error::malformed(MALFORMED_PATH, rejection.body_text()).into()
    }
}

/// Router fallback
pub async fn unknown_route(uri: Uri) -> ApiError {
    Error::not_found(UNKNOWN_ROUTE, format!("No route for {}", uri.path())).into()
}
