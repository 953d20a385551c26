//! Provider connections of the signed-in user

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use connect_core::ProviderName;
use serde::Serialize;
use tower_cookies::Cookies;

use crate::auth::Authenticator;
use crate::error::WebError;
use crate::state::AppState;
use crate::store::{SessionStore, UserStore};

use super::session::current_user_id;

#[derive(Serialize)]
pub struct ConnectionItem {
    pub provider_name: ProviderName,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ConnectionsResponse {
    pub items: Vec<ConnectionItem>,
}

/// GET /settings/profile/connections
pub async fn list_connections<U, S, A>(
    State(state): State<Arc<AppState<U, S, A>>>,
    cookies: Cookies,
) -> Result<Json<ConnectionsResponse>, WebError>
where
    U: UserStore,
    S: SessionStore,
    A: Authenticator,
{
    let user_id = current_user_id(&cookies, &state.cookie_key, state.session_store.as_ref())?
        .ok_or(WebError::NotAuthenticated)?;

    let items = state
        .user_store
        .list_connections(user_id)?
        .into_iter()
        .map(|c| ConnectionItem {
            provider_name: c.provider_name,
            provider_id: c.provider_id,
            created_at: c.created_at,
        })
        .collect();

    Ok(Json(ConnectionsResponse { items }))
}
