//! Common test utilities for connect integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::{TestResponse, TestServer};
use chrono::{Duration, Utc};
use connect_core::{Profile, ProviderName, Toast};
use connect_web::routes::session::SESSION_COOKIE;
use connect_web::store::UserId;
use connect_web::toast::TOAST_COOKIE;
use connect_web::{
    routes, AppState, AuthError, Authenticator, CallbackParams, InMemorySessionStore,
    InMemoryUserStore, SessionStore,
};
use cookie::{Cookie, CookieJar, Key};
use tower_cookies::Cookies;

pub const AUTHORIZE_URL: &str = "https://provider.example/authorize";

/// Authenticator that hands back a canned profile (or failure) and counts calls
#[derive(Default)]
pub struct FakeAuthenticator {
    profile: Mutex<Option<Profile>>,
    calls: AtomicUsize,
}

impl FakeAuthenticator {
    /// Make the next callbacks authenticate as `profile`; `None` fails them
    pub fn set_profile(&self, profile: Option<Profile>) {
        *self.profile.lock().unwrap() = profile;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn authorization_url(
        &self,
        _provider: ProviderName,
        _cookies: &Cookies,
    ) -> Result<String, AuthError> {
        Ok(AUTHORIZE_URL.to_string())
    }

    async fn authenticate(
        &self,
        _provider: ProviderName,
        _params: &CallbackParams,
        _cookies: &Cookies,
    ) -> Result<Profile, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::Provider("access_denied".to_string()))
    }
}

/// Test server plus handles on everything behind it
pub struct TestApp {
    pub server: TestServer,
    pub users: Arc<InMemoryUserStore>,
    pub sessions: Arc<InMemorySessionStore>,
    pub authenticator: Arc<FakeAuthenticator>,
    pub key: Key,
}

/// Create a test server with in-memory stores and a fake authenticator
pub fn create_test_server() -> TestApp {
    let users = Arc::new(InMemoryUserStore::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let authenticator = Arc::new(FakeAuthenticator::default());
    let key = Key::generate();

    let state = Arc::new(AppState::new(
        users.clone(),
        sessions.clone(),
        authenticator.clone(),
        key.clone(),
    ));

    let app = routes::create_router(state);
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        users,
        sessions,
        authenticator,
        key,
    }
}

/// A GitHub profile as the provider would return it
pub fn github_profile(id: &str, email: &str, username: &str) -> Profile {
    Profile {
        id: id.to_string(),
        email: email.to_string(),
        username: Some(username.to_string()),
        name: Some("Kody Koala".to_string()),
        image_url: Some("https://avatars.example/kody.png".to_string()),
    }
}

/// Encrypt a cookie the way the server's private jar would
pub fn encrypt_cookie(key: &Key, name: &str, value: &str) -> Cookie<'static> {
    let mut jar = CookieJar::new();
    jar.private_mut(key)
        .add(Cookie::new(name.to_string(), value.to_string()));
    jar.get(name).cloned().expect("cookie was just added")
}

/// Decrypt a private cookie set on a response
pub fn decrypt_cookie(key: &Key, response: &TestResponse, name: &str) -> Option<String> {
    let raw = response.maybe_cookie(name)?;
    let mut jar = CookieJar::new();
    jar.add_original(raw);
    jar.private(key).get(name).map(|c| c.value().to_string())
}

/// Toast queued by a response
pub fn response_toast(key: &Key, response: &TestResponse) -> Option<Toast> {
    let json = decrypt_cookie(key, response, TOAST_COOKIE)?;
    Some(Toast::from_json(&json).expect("toast cookie holds a toast"))
}

/// Start a session for `user_id` and return the cookie that carries it
pub fn login_cookie(app: &TestApp, user_id: UserId) -> Cookie<'static> {
    let session = app
        .sessions
        .create(user_id, Utc::now() + Duration::days(1))
        .expect("session created");
    encrypt_cookie(&app.key, SESSION_COOKIE, &session.id.0)
}

pub fn location(response: &TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .expect("location is ascii")
        .to_string()
}
