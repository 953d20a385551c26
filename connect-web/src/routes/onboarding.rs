//! Account creation for identities first seen through a provider

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::Utc;
use connect_core::{validate_username, Prefill, ProviderName, Toast};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookies, Key};

use crate::auth::Authenticator;
use crate::error::WebError;
use crate::state::AppState;
use crate::store::{SessionStore, UserStore};
use crate::toast::set_toast;
use crate::verification::{
    VerificationSession, ONBOARDING_EMAIL_KEY, PREFILLED_PROFILE_KEY, PROVIDER_ID_KEY,
    PROVIDER_NAME_KEY,
};

use super::auth::LOGIN_PATH;
use super::session::handle_new_session;

const NAME_MIN_LENGTH: usize = 3;
const NAME_MAX_LENGTH: usize = 40;

#[derive(Serialize)]
pub struct OnboardingResponse {
    pub email: String,
    pub prefill: Option<Prefill>,
    pub provider_id: Option<String>,
}

#[derive(Deserialize)]
pub struct OnboardingRequest {
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub agree_to_terms_of_service: bool,
    #[serde(default)]
    pub remember: bool,
    pub redirect_to: Option<String>,
}

/// GET /onboarding/{provider}
/// What the onboarding form needs to render
pub async fn get_onboarding<U, S, A>(
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
    let verification = VerificationSession::from_cookies(&cookies, &state.cookie_key);

    let Some(email) = verification
        .get::<String>(ONBOARDING_EMAIL_KEY)
        .filter(|_| started_with(&verification, provider))
    else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    Ok(Json(OnboardingResponse {
        email,
        prefill: verification.get(PREFILLED_PROFILE_KEY),
        provider_id: verification.get(PROVIDER_ID_KEY),
    })
    .into_response())
}

/// POST /onboarding/{provider}
/// Create the account, link the provider identity and log in
pub async fn complete_onboarding<U, S, A>(
    State(state): State<Arc<AppState<U, S, A>>>,
    cookies: Cookies,
    Path(provider): Path<String>,
    Json(req): Json<OnboardingRequest>,
) -> Result<Response, WebError>
where
    U: UserStore,
    S: SessionStore,
    A: Authenticator,
{
    let provider: ProviderName = provider.parse()?;
    let verification = VerificationSession::from_cookies(&cookies, &state.cookie_key);

    let (Some(email), Some(provider_id), true) = (
        verification.get::<String>(ONBOARDING_EMAIL_KEY),
        verification.get::<String>(PROVIDER_ID_KEY),
        started_with(&verification, provider),
    ) else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    validate_username(&req.username)?;
    let name = req.name.trim();
    let name_len = name.chars().count();
    if name_len < NAME_MIN_LENGTH || name_len > NAME_MAX_LENGTH {
        return Err(WebError::ValidationError(format!(
            "Name must be between {} and {} characters",
            NAME_MIN_LENGTH, NAME_MAX_LENGTH
        )));
    }
    if !req.agree_to_terms_of_service {
        return Err(WebError::ValidationError(
            "You must agree to the terms of service".to_string(),
        ));
    }

    let username = req.username.to_lowercase();
    if state.user_store.get_user_by_username(&username)?.is_some() {
        return Err(WebError::UsernameTaken);
    }

    // The identity may have been linked since the callback ran
    let connection = match state.user_store.create_user_with_connection(
        &email,
        &username,
        Some(name),
        provider,
        &provider_id,
    ) {
        Ok(connection) => connection,
        Err(WebError::ConnectionAlreadyExists) => {
            tracing::info!(%provider, "Identity was connected during onboarding");
            return already_connected(&cookies, &state.cookie_key, provider);
        }
        Err(e) => return Err(e),
    };
    let user_id = connection.user_id;
    let session = state
        .session_store
        .create(user_id, Utc::now() + state.session_ttl)?;

    tracing::info!(user_id = user_id.0, %provider, "Onboarding complete");

    VerificationSession::destroy(&cookies, &state.cookie_key);
    set_toast(
        &cookies,
        &state.cookie_key,
        &Toast::message("Welcome aboard!", "Thanks for signing up!"),
    )?;

    handle_new_session(
        &cookies,
        &state.cookie_key,
        &session,
        req.redirect_to.as_deref(),
        req.remember,
    )
}

/// The verification state was written by a callback for this provider
fn started_with(verification: &VerificationSession, provider: ProviderName) -> bool {
    verification.get::<ProviderName>(PROVIDER_NAME_KEY) == Some(provider)
}

/// Abandon onboarding for an identity that already belongs to an account
fn already_connected(
    cookies: &Cookies,
    key: &Key,
    provider: ProviderName,
) -> Result<Response, WebError> {
    VerificationSession::destroy(cookies, key);
    set_toast(
        cookies,
        key,
        &Toast::message(
            "Already Connected",
            format!(
                "This {} account is already connected to another account.",
                provider.label()
            ),
        ),
    )?;
    Ok(Redirect::to(LOGIN_PATH).into_response())
}
