//! Provider profiles and the onboarding prefill derived from them

use serde::{Deserialize, Serialize};

use crate::Error;

/// Minimum length of a username
pub const USERNAME_MIN_LENGTH: usize = 3;

/// Maximum length of a username
pub const USERNAME_MAX_LENGTH: usize = 20;

/// Character used to pad short usernames up to the minimum length
pub const USERNAME_FILLER: char = '_';

/// The identity a provider returns after a successful authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The provider's stable id for this account
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

impl Profile {
    /// Name to show the user when talking about this provider account
    pub fn display_username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }

    /// Build the onboarding form prefill for a brand-new identity
    pub fn prefill(&self) -> Prefill {
        Prefill {
            email: self.email.to_lowercase(),
            username: self.username.as_deref().map(sanitize_username),
            name: self.name.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Profile fields carried into onboarding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefill {
    pub email: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Turn a provider username into one acceptable for onboarding.
///
/// Strips characters outside `[a-zA-Z0-9_]`, lower-cases, caps the length
/// at [`USERNAME_MAX_LENGTH`] and then pads with [`USERNAME_FILLER`] up to
/// [`USERNAME_MIN_LENGTH`]. Padding happens after truncation.
pub fn sanitize_username(raw: &str) -> String {
    let mut username: String = raw
        .chars()
        .filter(|c| is_username_char(*c))
        .map(|c| c.to_ascii_lowercase())
        .take(USERNAME_MAX_LENGTH)
        .collect();

    while username.len() < USERNAME_MIN_LENGTH {
        username.push(USERNAME_FILLER);
    }

    username
}

/// Check a username chosen during onboarding
pub fn validate_username(username: &str) -> Result<(), Error> {
    let len = username.chars().count();
    if len < USERNAME_MIN_LENGTH {
        return Err(Error::InvalidUsername(format!(
            "must be at least {} characters",
            USERNAME_MIN_LENGTH
        )));
    }
    if len > USERNAME_MAX_LENGTH {
        return Err(Error::InvalidUsername(format!(
            "must be at most {} characters",
            USERNAME_MAX_LENGTH
        )));
    }
    if !username.chars().all(is_username_char) {
        return Err(Error::InvalidUsername(
            "can only include letters, numbers, and underscores".to_string(),
        ));
    }
    Ok(())
}
