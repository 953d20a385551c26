//! Service configuration

use std::fmt;

use anyhow::{anyhow, Context, Result};
use base64::Engine as _;
use connect_core::ProviderName;
use serde::Deserialize;
use tower_cookies::Key;

/// Default session lifetime in days
pub const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 30;

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Externally visible base URL, used to build OAuth redirect URLs
    pub public_url: String,

    /// SQLite database path; in-memory stores are used when unset
    pub database_path: Option<String>,

    /// Base64-encoded key (64 bytes) for encrypting cookies
    pub session_secret: Option<String>,

    /// Lifetime of login sessions
    pub session_expiration_days: i64,

    /// GitHub OAuth application credentials
    pub github: Option<OAuthClientConfig>,
}

#[derive(Clone, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            public_url: "http://localhost:3000".to_string(),
            database_path: None,
            session_secret: None,
            session_expiration_days: DEFAULT_SESSION_EXPIRATION_DAYS,
            github: None,
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("public_url", &self.public_url)
            .field("database_path", &self.database_path)
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .field("session_expiration_days", &self.session_expiration_days)
            .field("github", &self.github.as_ref().map(|g| g.client_id.as_str()))
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(v) => v.parse().with_context(|| format!("invalid PORT: {}", v))?,
            Err(_) => defaults.port,
        };

        let session_expiration_days = match std::env::var("SESSION_EXPIRATION_DAYS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("invalid SESSION_EXPIRATION_DAYS: {}", v))?,
            Err(_) => defaults.session_expiration_days,
        };

        let github = match (
            std::env::var("GITHUB_CLIENT_ID"),
            std::env::var("GITHUB_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret)) => Some(OAuthClientConfig {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Self {
            port,
            public_url: std::env::var("PUBLIC_URL").unwrap_or(defaults.public_url),
            database_path: std::env::var("DATABASE_PATH").ok(),
            session_secret: std::env::var("SESSION_SECRET").ok(),
            session_expiration_days,
            github,
        })
    }

    /// Credentials for a provider, if configured
    pub fn provider_client(&self, provider: ProviderName) -> Option<&OAuthClientConfig> {
        match provider {
            ProviderName::GitHub => self.github.as_ref(),
        }
    }

    /// Callback URL registered with the provider
    pub fn redirect_url(&self, provider: ProviderName) -> String {
        format!(
            "{}/auth/{}/callback",
            self.public_url.trim_end_matches('/'),
            provider
        )
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_expiration_days)
    }

    /// Cookie encryption key. Generates a throwaway key when no secret is set.
    pub fn cookie_key(&self) -> Result<Key> {
        match &self.session_secret {
            Some(secret) => decode_cookie_key(secret),
            None => {
                tracing::warn!(
                    "SESSION_SECRET not provided; generated a temporary key. Sessions will be invalidated on restart."
                );
                Ok(Key::generate())
            }
        }
    }
}

/// Decode a base64 secret into a cookie key (at least 64 bytes)
pub fn decode_cookie_key(b64: &str) -> Result<Key> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim().as_bytes())
        .map_err(|e| anyhow!("invalid SESSION_SECRET: {}", e))?;
    Key::try_from(bytes.as_slice()).map_err(|_| {
        anyhow!(
            "SESSION_SECRET must decode to at least 64 bytes, got {}",
            bytes.len()
        )
    })
}
