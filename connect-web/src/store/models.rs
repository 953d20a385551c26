//! Data models for account storage

use chrono::{DateTime, Utc};
use connect_core::ProviderName;
use serde::{Deserialize, Serialize};

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// A user account
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Stored lower-cased
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Link between a user and one provider identity
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub provider_name: ProviderName,
    pub provider_id: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A login session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub expiration_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expiration_date <= Utc::now()
    }
}
