//! Storage abstractions for accounts, connections and sessions

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{InMemorySessionStore, InMemoryUserStore};
pub use models::*;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use connect_core::ProviderName;

use crate::error::WebError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, WebError>;

/// Trait for user and connection storage
pub trait UserStore: Send + Sync {
    /// Create a new user. Email and username must both be unused.
    fn create_user(&self, email: &str, username: &str, name: Option<&str>) -> StoreResult<UserId>;

    /// Create a user together with its first connection. Either both are
    /// stored or neither is.
    fn create_user_with_connection(
        &self,
        email: &str,
        username: &str,
        name: Option<&str>,
        provider_name: ProviderName,
        provider_id: &str,
    ) -> StoreResult<Connection>;

    /// Get a user by email address (case-insensitive)
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Get a user by username
    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Link a provider identity to a user.
    /// Fails with `ConnectionAlreadyExists` if the identity is linked already.
    fn create_connection(
        &self,
        provider_name: ProviderName,
        provider_id: &str,
        user_id: UserId,
    ) -> StoreResult<Connection>;

    /// Find the connection for a provider identity
    fn get_connection(
        &self,
        provider_name: ProviderName,
        provider_id: &str,
    ) -> StoreResult<Option<Connection>>;

    /// List all connections for a user, oldest first
    fn list_connections(&self, user_id: UserId) -> StoreResult<Vec<Connection>>;
}

/// Trait for session storage
pub trait SessionStore: Send + Sync {
    /// Create a new session for a user
    fn create(&self, user_id: UserId, expiration_date: DateTime<Utc>) -> StoreResult<Session>;

    /// Get a session by ID
    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>>;

    /// Delete a session. Deleting an unknown session is not an error.
    fn delete(&self, session_id: &SessionId) -> StoreResult<()>;
}

/// Allow sharing one store between the user and session roles
impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    fn create_user(&self, email: &str, username: &str, name: Option<&str>) -> StoreResult<UserId> {
        (**self).create_user(email, username, name)
    }

    fn create_user_with_connection(
        &self,
        email: &str,
        username: &str,
        name: Option<&str>,
        provider_name: ProviderName,
        provider_id: &str,
    ) -> StoreResult<Connection> {
        (**self).create_user_with_connection(email, username, name, provider_name, provider_id)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        (**self).get_user_by_email(email)
    }

    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        (**self).get_user_by_username(username)
    }

    fn create_connection(
        &self,
        provider_name: ProviderName,
        provider_id: &str,
        user_id: UserId,
    ) -> StoreResult<Connection> {
        (**self).create_connection(provider_name, provider_id, user_id)
    }

    fn get_connection(
        &self,
        provider_name: ProviderName,
        provider_id: &str,
    ) -> StoreResult<Option<Connection>> {
        (**self).get_connection(provider_name, provider_id)
    }

    fn list_connections(&self, user_id: UserId) -> StoreResult<Vec<Connection>> {
        (**self).list_connections(user_id)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn create(&self, user_id: UserId, expiration_date: DateTime<Utc>) -> StoreResult<Session> {
        (**self).create(user_id, expiration_date)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        (**self).get(session_id)
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        (**self).delete(session_id)
    }
}
