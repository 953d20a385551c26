//! Provider authentication
//!
//! The [`Authenticator`] turns a provider's callback into a [`Profile`]. It
//! either returns a complete profile or an [`AuthError`]; callers convert the
//! error into a redirect rather than a server fault.

pub mod oauth;

pub use oauth::{OAuthAuthenticator, ProviderEndpoints};

use std::sync::Arc;

use async_trait::async_trait;
use connect_core::{Profile, ProviderName};
use serde::Deserialize;
use thiserror::Error;
use tower_cookies::Cookies;

/// Query parameters a provider appends to the callback URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Provider {0} is not configured")]
    NotConfigured(ProviderName),

    #[error("Provider returned an error: {0}")]
    Provider(String),

    #[error("Missing authorization code")]
    MissingCode,

    #[error("Missing or mismatched state")]
    StateMismatch,

    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("Failed to load profile: {0}")]
    Profile(String),

    #[error("Invalid provider settings: {0}")]
    Config(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Build the URL to send the user to, recording whatever state the
    /// callback will need in `cookies`
    async fn authorization_url(
        &self,
        provider: ProviderName,
        cookies: &Cookies,
    ) -> Result<String, AuthError>;

    /// Exchange the provider callback for the user's profile
    async fn authenticate(
        &self,
        provider: ProviderName,
        params: &CallbackParams,
        cookies: &Cookies,
    ) -> Result<Profile, AuthError>;
}

#[async_trait]
impl<T: Authenticator + ?Sized> Authenticator for Arc<T> {
    async fn authorization_url(
        &self,
        provider: ProviderName,
        cookies: &Cookies,
    ) -> Result<String, AuthError> {
        (**self).authorization_url(provider, cookies).await
    }

    async fn authenticate(
        &self,
        provider: ProviderName,
        params: &CallbackParams,
        cookies: &Cookies,
    ) -> Result<Profile, AuthError> {
        (**self).authenticate(provider, params, cookies).await
    }
}
