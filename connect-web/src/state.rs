//! Shared application state

use std::sync::Arc;

use chrono::Duration;
use tower_cookies::Key;

use crate::auth::Authenticator;
use crate::config::DEFAULT_SESSION_EXPIRATION_DAYS;
use crate::store::{SessionStore, UserStore};

/// State shared by every route, generic over its collaborators so tests can
/// swap in in-memory stores and a fake authenticator.
pub struct AppState<U, S, A> {
    pub user_store: Arc<U>,
    pub session_store: Arc<S>,
    pub authenticator: Arc<A>,
    /// Key for the private (encrypted) cookies
    pub cookie_key: Key,
    /// Lifetime of newly created sessions
    pub session_ttl: Duration,
}

impl<U, S, A> AppState<U, S, A>
where
    U: UserStore,
    S: SessionStore,
    A: Authenticator,
{
    pub fn new(user_store: U, session_store: S, authenticator: A, cookie_key: Key) -> Self {
        Self {
            user_store: Arc::new(user_store),
            session_store: Arc::new(session_store),
            authenticator: Arc::new(authenticator),
            cookie_key,
            session_ttl: Duration::days(DEFAULT_SESSION_EXPIRATION_DAYS),
        }
    }

    pub fn with_session_ttl(mut self, session_ttl: Duration) -> Self {
        self.session_ttl = session_ttl;
        self
    }
}
