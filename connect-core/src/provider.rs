//! Supported identity providers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// An external OAuth identity issuer this service accepts logins from.
///
/// The set is closed: route parameters that don't parse into one of these
/// are rejected before any network or database work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    GitHub,
}

impl ProviderName {
    /// Every supported provider
    pub const ALL: &'static [ProviderName] = &[ProviderName::GitHub];

    /// Identifier used in routes, cookies and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::GitHub => "github",
        }
    }

    /// Human readable name used in notifications
    pub fn label(&self) -> &'static str {
        match self {
            ProviderName::GitHub => "GitHub",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}
