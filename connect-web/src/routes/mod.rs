//! HTTP routes for the connect service

pub mod auth;
mod connections;
mod onboarding;
pub mod session;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Authenticator;
use crate::state::AppState;
use crate::store::{SessionStore, UserStore};

/// Create the router with all routes
pub fn create_router<U, S, A>(state: Arc<AppState<U, S, A>>) -> Router
where
    U: UserStore + 'static,
    S: SessionStore + 'static,
    A: Authenticator + 'static,
{
    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/{provider}", post(auth::start::<U, S, A>))
        .route("/auth/{provider}/callback", get(auth::callback::<U, S, A>))
        .route(
            "/onboarding/{provider}",
            get(onboarding::get_onboarding::<U, S, A>)
                .post(onboarding::complete_onboarding::<U, S, A>),
        )
        .route(
            "/settings/profile/connections",
            get(connections::list_connections::<U, S, A>),
        )
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
