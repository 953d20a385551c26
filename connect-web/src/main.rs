//! Connect service

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connect_web::{
    routes, AppState, Authenticator, Config, InMemorySessionStore, InMemoryUserStore,
    OAuthAuthenticator, SessionStore, SqliteStore, UserStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "connect_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(?config, "Loaded configuration");

    let cookie_key = config.cookie_key()?;
    let authenticator = OAuthAuthenticator::from_config(&config, cookie_key.clone())?;

    match &config.database_path {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            tracing::info!(%path, "Using SQLite store");
            let state = AppState::new(store.clone(), store, authenticator, cookie_key)
                .with_session_ttl(config.session_ttl());
            serve(&config, state).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, accounts will not survive a restart");
            let state = AppState::new(
                InMemoryUserStore::new(),
                InMemorySessionStore::new(),
                authenticator,
                cookie_key,
            )
            .with_session_ttl(config.session_ttl());
            serve(&config, state).await
        }
    }
}

async fn serve<U, S, A>(config: &Config, state: AppState<U, S, A>) -> Result<()>
where
    U: UserStore + 'static,
    S: SessionStore + 'static,
    A: Authenticator + 'static,
{
    let app = routes::create_router(Arc::new(state));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Public URL is {}", config.public_url);

    axum::serve(listener, app).await?;

    Ok(())
}
