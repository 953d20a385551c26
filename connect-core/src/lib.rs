//! Connect Core Library
//!
//! Domain types shared by the connect service:
//! - The fixed set of supported identity providers
//! - The profile a provider hands back after authentication
//! - The prefilled onboarding profile derived from it
//! - One-shot toast notifications shown after redirects

pub mod error;
pub mod profile;
pub mod provider;
pub mod toast;

pub use error::Error;
pub use profile::{sanitize_username, validate_username, Prefill, Profile};
pub use provider::ProviderName;
pub use toast::{Toast, ToastKind};

/// Result type for connect-core operations
pub type Result<T> = std::result::Result<T, Error>;
