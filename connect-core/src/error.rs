//! Error types for connect-core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
