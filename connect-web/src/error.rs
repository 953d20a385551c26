//! Service error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("A user already exists with this username")]
    UsernameTaken,

    #[error("Connection already exists")]
    ConnectionAlreadyExists,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<connect_core::Error> for WebError {
    fn from(err: connect_core::Error) -> Self {
        match err {
            connect_core::Error::UnknownProvider(name) => WebError::UnknownProvider(name),
            connect_core::Error::InvalidUsername(msg) => {
                WebError::ValidationError(format!("Username {}", msg))
            }
            connect_core::Error::Json(e) => WebError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebError::UnknownProvider(_) => (StatusCode::BAD_REQUEST, "Unknown provider"),
            WebError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            WebError::EmailAlreadyExists => (StatusCode::CONFLICT, "Email already exists"),
            WebError::UsernameTaken => (
                StatusCode::BAD_REQUEST,
                "A user already exists with this username",
            ),
            WebError::ConnectionAlreadyExists => {
                (StatusCode::CONFLICT, "Connection already exists")
            }
            WebError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            WebError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}
