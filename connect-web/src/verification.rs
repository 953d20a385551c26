//! Short-lived cookie-backed store carrying onboarding state across redirects

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

use crate::error::WebError;

pub const VERIFICATION_COOKIE: &str = "en_verification";

/// Email of the identity being onboarded
pub const ONBOARDING_EMAIL_KEY: &str = "onboardingEmail";

/// Sanitized profile used to prefill the onboarding form
pub const PREFILLED_PROFILE_KEY: &str = "prefilledProfile";

/// Provider's id for the identity being onboarded
pub const PROVIDER_ID_KEY: &str = "providerId";

/// Provider that authenticated the identity being onboarded
pub const PROVIDER_NAME_KEY: &str = "providerName";

/// Lifetime of the verification cookie in minutes
pub const VERIFICATION_MAX_AGE_MINUTES: i64 = 10;

/// Key/value map stored as JSON in a private cookie.
///
/// Changes only reach the client once [`VerificationSession::commit`] is called.
#[derive(Debug, Clone, Default)]
pub struct VerificationSession {
    values: Map<String, Value>,
}

impl VerificationSession {
    /// Load the session from the request. A missing or undecryptable cookie
    /// yields an empty session.
    pub fn from_cookies(cookies: &Cookies, key: &Key) -> Self {
        let values = cookies
            .private(key)
            .get(VERIFICATION_COOKIE)
            .and_then(|c| serde_json::from_str::<Map<String, Value>>(c.value()).ok())
            .unwrap_or_default();
        Self { values }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), WebError> {
        let value = serde_json::to_value(value).map_err(|e| WebError::Internal(e.to_string()))?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Write the session to the response cookie
    pub fn commit(&self, cookies: &Cookies, key: &Key) -> Result<(), WebError> {
        let payload =
            serde_json::to_string(&self.values).map_err(|e| WebError::Internal(e.to_string()))?;
        let cookie = Cookie::build((VERIFICATION_COOKIE, payload))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(Duration::minutes(VERIFICATION_MAX_AGE_MINUTES))
            .build();
        cookies.private(key).add(cookie);
        Ok(())
    }

    /// Remove the session cookie from the client
    pub fn destroy(cookies: &Cookies, key: &Key) {
        cookies
            .private(key)
            .remove(Cookie::build((VERIFICATION_COOKIE, "")).path("/").build());
    }
}
