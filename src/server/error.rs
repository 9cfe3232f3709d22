//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Body text for every token that fails to resolve
pub const INVALID_TOKEN_MESSAGE: &str = "invalid or expired token";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or unknown API key")]
    Unauthorized,

    #[error("role {0} may not issue share links")]
    Forbidden(crate::auth::Role),

    #[error("{0}")]
    BadRequest(String),

    /// Any token that failed to verify, for whatever reason
    #[error("{}", INVALID_TOKEN_MESSAGE)]
    InvalidToken,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidToken => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<crate::auth::InvalidToken> for ApiError {
    fn from(_: crate::auth::InvalidToken) -> Self {
        ApiError::InvalidToken
    }
}

impl From<crate::auth::TokenError> for ApiError {
    fn from(e: crate::auth::TokenError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}
