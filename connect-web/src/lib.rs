//! Connect
//!
//! Sign in with an external identity provider: complete the provider's
//! callback, link the identity to an account and start a session, or hand
//! new identities over to onboarding.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;
pub mod toast;
pub mod verification;

pub use auth::{AuthError, Authenticator, CallbackParams, OAuthAuthenticator};
pub use config::{decode_cookie_key, Config};
pub use error::WebError;
pub use state::AppState;
pub use store::{InMemorySessionStore, InMemoryUserStore, SessionStore, SqliteStore, UserStore};
