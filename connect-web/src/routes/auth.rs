//! Provider login endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use chrono::{Duration, Utc};
use connect_core::{Profile, ProviderName, Toast};
use tower_cookies::{Cookies, Key};

use crate::auth::{Authenticator, CallbackParams};
use crate::error::WebError;
use crate::state::AppState;
use crate::store::{Session, SessionStore, StoreResult, UserId, UserStore};
use crate::toast::set_toast;
use crate::verification::{
    VerificationSession, ONBOARDING_EMAIL_KEY, PREFILLED_PROFILE_KEY, PROVIDER_ID_KEY,
    PROVIDER_NAME_KEY,
};

use super::session;

pub const LOGIN_PATH: &str = "/login";
pub const CONNECTIONS_PATH: &str = "/settings/profile/connections";

/// POST /auth/{provider}
/// Send the user to the provider's authorization page
pub async fn start<U, S, A>(
    State(state): State<Arc<AppState<U, S, A>>>,
    cookies: Cookies,
    Path(provider): Path<String>,
) -> Result<Response, WebError>
where
    U: UserStore,
    S: SessionStore,
    A: Authenticator,
{
    let provider: ProviderName = provider.parse()?;

    match state.authenticator.authorization_url(provider, &cookies).await {
        Ok(url) => Ok(Redirect::to(&url).into_response()),
        Err(e) => {
            tracing::error!(%provider, error = %e, "Failed to start provider login");
            CallbackOutcome::AuthFailed { provider }.render(&cookies, &state.cookie_key)
        }
    }
}

/// GET /auth/{provider}/callback
/// Complete a provider login
pub async fn callback<U, S, A>(
    State(state): State<Arc<AppState<U, S, A>>>,
    cookies: Cookies,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, WebError>
where
    U: UserStore,
    S: SessionStore,
    A: Authenticator,
{
    // Reject unknown providers before touching any collaborator
    let provider: ProviderName = provider.parse()?;

    let outcome = match state.authenticator.authenticate(provider, &params, &cookies).await {
        Ok(profile) => {
            let current_user =
                session::current_user_id(&cookies, &state.cookie_key, state.session_store.as_ref())?;
            resolve_login(
                state.user_store.as_ref(),
                state.session_store.as_ref(),
                state.session_ttl,
                current_user,
                provider,
                profile,
            )?
        }
        Err(e) => {
            tracing::error!(%provider, error = %e, "Provider authentication failed");
            CallbackOutcome::AuthFailed { provider }
        }
    };

    tracing::info!(%provider, outcome = outcome.name(), "Provider callback handled");
    outcome.render(&cookies, &state.cookie_key)
}

/// Every way a provider callback can end
#[derive(Debug)]
pub enum CallbackOutcome {
    /// The provider exchange failed
    AuthFailed { provider: ProviderName },

    /// The signed-in user already owns this connection
    AlreadyConnected {
        provider: ProviderName,
        profile: Profile,
    },

    /// The connection belongs to someone other than the signed-in user
    ConnectedToAnotherUser {
        provider: ProviderName,
        profile: Profile,
    },

    /// Known connection: log its owner in
    LoggedIn { session: Session },

    /// Existing account matched by email: connection created and logged in
    Connected {
        provider: ProviderName,
        profile: Profile,
        session: Session,
    },

    /// Unknown identity: continue to onboarding
    Onboarding {
        provider: ProviderName,
        profile: Profile,
    },
}

/// Reconcile an authenticated profile against stored connections and users,
/// performing whatever writes the chosen branch needs.
pub fn resolve_login<U, S>(
    users: &U,
    sessions: &S,
    session_ttl: Duration,
    current_user: Option<UserId>,
    provider: ProviderName,
    profile: Profile,
) -> StoreResult<CallbackOutcome>
where
    U: UserStore + ?Sized,
    S: SessionStore + ?Sized,
{
    let existing = users.get_connection(provider, &profile.id)?;

    if let (Some(connection), Some(user_id)) = (&existing, current_user) {
        return Ok(if connection.user_id == user_id {
            CallbackOutcome::AlreadyConnected { provider, profile }
        } else {
            CallbackOutcome::ConnectedToAnotherUser { provider, profile }
        });
    }

    if let Some(connection) = existing {
        let session = sessions.create(connection.user_id, Utc::now() + session_ttl)?;
        return Ok(CallbackOutcome::LoggedIn { session });
    }

    if let Some(user) = users.get_user_by_email(&profile.email)? {
        users.create_connection(provider, &profile.id, user.id)?;
        let session = sessions.create(user.id, Utc::now() + session_ttl)?;
        return Ok(CallbackOutcome::Connected {
            provider,
            profile,
            session,
        });
    }

    Ok(CallbackOutcome::Onboarding { provider, profile })
}

impl CallbackOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            CallbackOutcome::AuthFailed { .. } => "auth_failed",
            CallbackOutcome::AlreadyConnected { .. } => "already_connected",
            CallbackOutcome::ConnectedToAnotherUser { .. } => "connected_to_another_user",
            CallbackOutcome::LoggedIn { .. } => "logged_in",
            CallbackOutcome::Connected { .. } => "connected",
            CallbackOutcome::Onboarding { .. } => "onboarding",
        }
    }

    /// Render the outcome as a redirect with its cookies
    pub fn render(self, cookies: &Cookies, key: &Key) -> Result<Response, WebError> {
        match self {
            CallbackOutcome::AuthFailed { provider } => {
                let toast = Toast::error(
                    "Auth Failed",
                    format!("There was an error authenticating with {}.", provider.label()),
                );
                set_toast(cookies, key, &toast)?;
                Ok(Redirect::to(LOGIN_PATH).into_response())
            }
            CallbackOutcome::AlreadyConnected { provider, profile } => {
                let toast = Toast::message(
                    "Already Connected",
                    format!(
                        "Your \"{}\" {} account is already connected.",
                        profile.display_username(),
                        provider.label()
                    ),
                );
                set_toast(cookies, key, &toast)?;
                Ok(Redirect::to(CONNECTIONS_PATH).into_response())
            }
            CallbackOutcome::ConnectedToAnotherUser { provider, profile } => {
                let toast = Toast::message(
                    "Already Connected",
                    format!(
                        "The \"{}\" {} account is already connected to another account.",
                        profile.display_username(),
                        provider.label()
                    ),
                );
                set_toast(cookies, key, &toast)?;
                Ok(Redirect::to(CONNECTIONS_PATH).into_response())
            }
            CallbackOutcome::LoggedIn { session } => {
                session::handle_new_session(cookies, key, &session, None, true)
            }
            CallbackOutcome::Connected {
                provider,
                profile,
                session,
            } => {
                let toast = Toast::success(
                    "Connected",
                    format!(
                        "Your \"{}\" {} account has been connected.",
                        profile.display_username(),
                        provider.label()
                    ),
                );
                set_toast(cookies, key, &toast)?;
                session::handle_new_session(cookies, key, &session, Some(CONNECTIONS_PATH), true)
            }
            CallbackOutcome::Onboarding { provider, profile } => {
                let mut verification = VerificationSession::from_cookies(cookies, key);
                verification.set(ONBOARDING_EMAIL_KEY, &profile.email)?;
                verification.set(PREFILLED_PROFILE_KEY, &profile.prefill())?;
                verification.set(PROVIDER_ID_KEY, &profile.id)?;
                verification.set(PROVIDER_NAME_KEY, &provider)?;
                verification.commit(cookies, key)?;

                Ok(Redirect::to(&format!("/onboarding/{}", provider)).into_response())
            }
        }
    }
}
