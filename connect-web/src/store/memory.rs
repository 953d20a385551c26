//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use connect_core::ProviderName;
use uuid::Uuid;

use super::{Connection, Session, SessionId, SessionStore, StoreResult, User, UserId, UserStore};
use crate::error::WebError;

/// In-memory user and connection store
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
    connections: RwLock<HashMap<(ProviderName, String), Connection>>,
    next_user_id: AtomicU64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            connections: RwLock::new(HashMap::new()),
            next_user_id: AtomicU64::new(1),
        }
    }

    /// Total number of connections across all users (for testing purposes)
    pub fn connection_count(&self) -> usize {
        self.connections.read().unwrap().len()
    }

    /// Number of user accounts (for testing purposes)
    pub fn user_count(&self) -> usize {
        self.users.read().unwrap().len()
    }

    fn insert_user(
        &self,
        users: &mut HashMap<UserId, User>,
        email: &str,
        username: &str,
        name: Option<&str>,
    ) -> StoreResult<UserId> {
        let email = email.to_lowercase();
        if users.values().any(|u| u.email == email) {
            return Err(WebError::EmailAlreadyExists);
        }
        if users.values().any(|u| u.username == username) {
            return Err(WebError::UsernameTaken);
        }

        let id = UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst));
        users.insert(
            id,
            User {
                id,
                email,
                username: username.to_string(),
                name: name.map(str::to_string),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }
}

fn new_connection(provider_name: ProviderName, provider_id: &str, user_id: UserId) -> Connection {
    Connection {
        provider_name,
        provider_id: provider_id.to_string(),
        user_id,
        created_at: Utc::now(),
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for InMemoryUserStore {
    fn create_user(&self, email: &str, username: &str, name: Option<&str>) -> StoreResult<UserId> {
        let mut users = self.users.write().unwrap();
        self.insert_user(&mut users, email, username, name)
    }

    fn create_user_with_connection(
        &self,
        email: &str,
        username: &str,
        name: Option<&str>,
        provider_name: ProviderName,
        provider_id: &str,
    ) -> StoreResult<Connection> {
        // Users before connections, so no other path can deadlock against this
        let mut users = self.users.write().unwrap();
        let mut connections = self.connections.write().unwrap();

        let key = (provider_name, provider_id.to_string());
        if connections.contains_key(&key) {
            return Err(WebError::ConnectionAlreadyExists);
        }
        let user_id = self.insert_user(&mut users, email, username, name)?;

        let connection = new_connection(provider_name, provider_id, user_id);
        connections.insert(key, connection.clone());
        Ok(connection)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let normalized = email.to_lowercase();
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.email == normalized)
            .cloned())
    }

    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    fn create_connection(
        &self,
        provider_name: ProviderName,
        provider_id: &str,
        user_id: UserId,
    ) -> StoreResult<Connection> {
        let key = (provider_name, provider_id.to_string());
        let mut connections = self.connections.write().unwrap();
        if connections.contains_key(&key) {
            return Err(WebError::ConnectionAlreadyExists);
        }

        let connection = new_connection(provider_name, provider_id, user_id);
        connections.insert(key, connection.clone());
        Ok(connection)
    }

    fn get_connection(
        &self,
        provider_name: ProviderName,
        provider_id: &str,
    ) -> StoreResult<Option<Connection>> {
        Ok(self
            .connections
            .read()
            .unwrap()
            .get(&(provider_name, provider_id.to_string()))
            .cloned())
    }

    fn list_connections(&self, user_id: UserId) -> StoreResult<Vec<Connection>> {
        let mut list: Vec<Connection> = self
            .connections
            .read()
            .unwrap()
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by_key(|c| c.created_at);
        Ok(list)
    }
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored sessions (for testing purposes)
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All sessions belonging to a user (for testing purposes)
    pub fn sessions_for(&self, user_id: UserId) -> Vec<Session> {
        self.sessions
            .read()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, user_id: UserId, expiration_date: DateTime<Utc>) -> StoreResult<Session> {
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            user_id,
            expiration_date,
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(session_id);
        Ok(())
    }
}
