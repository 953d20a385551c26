//! Provider callback outcomes

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{
    create_test_server, decrypt_cookie, encrypt_cookie, github_profile, location, login_cookie,
    response_toast,
};
use connect_core::{ProviderName, ToastKind};
use connect_web::routes::session::SESSION_COOKIE;
use connect_web::store::{SessionId, SessionStore, UserStore};
use connect_web::verification::VERIFICATION_COOKIE;
use serde_json::Value;

const CALLBACK: &str = "/auth/github/callback?code=abc&state=xyz";

/// Test: an unknown provider is rejected before the authenticator runs
#[tokio::test]
async fn test_unknown_provider_rejected() {
    let app = create_test_server();
    app.authenticator
        .set_profile(Some(github_profile("1", "kody@example.com", "kody")));

    let response = app.server.get("/auth/gitlab/callback?code=abc").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(app.authenticator.calls(), 0);
}

/// Test: a failed authentication redirects to login with an error toast
#[tokio::test]
async fn test_auth_failure_redirects_to_login() {
    let app = create_test_server();
    app.authenticator.set_profile(None);

    let response = app.server.get(CALLBACK).await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let toast = response_toast(&app.key, &response).expect("toast set");
    assert_eq!(toast.kind, ToastKind::Error);
    assert_eq!(toast.title.as_deref(), Some("Auth Failed"));
    assert_eq!(
        toast.description,
        "There was an error authenticating with GitHub."
    );
    assert_eq!(app.authenticator.calls(), 1);
    assert!(app.sessions.is_empty());
    assert!(response.maybe_cookie(SESSION_COOKIE).is_none());
}

/// Test: re-linking an identity the signed-in user already owns
#[tokio::test]
async fn test_already_connected_to_current_user() {
    let app = create_test_server();
    let user_id = app.users.create_user("kody@example.com", "kody", None).unwrap();
    app.users
        .create_connection(ProviderName::GitHub, "1234", user_id)
        .unwrap();
    app.authenticator
        .set_profile(Some(github_profile("1234", "kody@example.com", "kody")));

    let response = app
        .server
        .get(CALLBACK)
        .add_cookie(login_cookie(&app, user_id))
        .await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/settings/profile/connections");
    let toast = response_toast(&app.key, &response).expect("toast set");
    assert_eq!(toast.title.as_deref(), Some("Already Connected"));
    assert_eq!(
        toast.description,
        "Your \"kody\" GitHub account is already connected."
    );
    // Only the session from login_cookie exists
    assert_eq!(app.sessions.len(), 1);
    assert_eq!(app.users.connection_count(), 1);
}

/// Test: an identity linked to someone else is not moved or logged into
#[tokio::test]
async fn test_connected_to_another_user() {
    let app = create_test_server();
    let owner = app.users.create_user("kody@example.com", "kody", None).unwrap();
    let other = app.users.create_user("hannah@example.com", "hannah", None).unwrap();
    app.users
        .create_connection(ProviderName::GitHub, "1234", owner)
        .unwrap();
    app.authenticator
        .set_profile(Some(github_profile("1234", "kody@example.com", "kody")));

    let response = app
        .server
        .get(CALLBACK)
        .add_cookie(login_cookie(&app, other))
        .await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/settings/profile/connections");
    let toast = response_toast(&app.key, &response).expect("toast set");
    assert_eq!(toast.title.as_deref(), Some("Already Connected"));
    assert_eq!(
        toast.description,
        "The \"kody\" GitHub account is already connected to another account."
    );
    assert!(app.sessions.sessions_for(owner).is_empty());
    let connection = app
        .users
        .get_connection(ProviderName::GitHub, "1234")
        .unwrap()
        .unwrap();
    assert_eq!(connection.user_id, owner);
}

/// Test: a known identity logs its owner in
#[tokio::test]
async fn test_existing_connection_logs_in() {
    let app = create_test_server();
    let owner = app.users.create_user("kody@example.com", "kody", None).unwrap();
    app.users
        .create_connection(ProviderName::GitHub, "1234", owner)
        .unwrap();
    app.authenticator
        .set_profile(Some(github_profile("1234", "kody@example.com", "kody")));

    let response = app.server.get(CALLBACK).await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let sessions = app.sessions.sessions_for(owner);
    assert_eq!(sessions.len(), 1);
    let session_id = decrypt_cookie(&app.key, &response, SESSION_COOKIE).expect("session cookie");
    assert_eq!(session_id, sessions[0].id.0);

    // Callback logins are remembered
    let raw = response.cookie(SESSION_COOKIE);
    assert!(raw.expires().is_some());
    assert_eq!(raw.http_only(), Some(true));
}

/// Test: an expired session does not count as signed in
#[tokio::test]
async fn test_expired_session_is_not_authenticated() {
    let app = create_test_server();
    let owner = app.users.create_user("kody@example.com", "kody", None).unwrap();
    let other = app.users.create_user("hannah@example.com", "hannah", None).unwrap();
    app.users
        .create_connection(ProviderName::GitHub, "1234", owner)
        .unwrap();
    app.authenticator
        .set_profile(Some(github_profile("1234", "kody@example.com", "kody")));

    let expired = app
        .sessions
        .create(other, Utc::now() - Duration::hours(1))
        .unwrap();
    let cookie = encrypt_cookie(&app.key, SESSION_COOKIE, &expired.id.0);

    let response = app.server.get(CALLBACK).add_cookie(cookie).await;

    // Treated as a fresh login by the owner rather than a conflict
    assert_eq!(location(&response), "/");
    assert_eq!(app.sessions.sessions_for(owner).len(), 1);
    assert!(response_toast(&app.key, &response).is_none());
    // The stale session is cleaned up
    assert!(app.sessions.get(&expired.id).unwrap().is_none());
}

/// Test: a session cookie for an unknown session does not count as signed in
#[tokio::test]
async fn test_unknown_session_is_not_authenticated() {
    let app = create_test_server();
    app.authenticator
        .set_profile(Some(github_profile("1234", "kody@example.com", "kody")));
    let cookie = encrypt_cookie(&app.key, SESSION_COOKIE, "no-such-session");

    let response = app.server.get(CALLBACK).add_cookie(cookie).await;

    assert!(app
        .sessions
        .get(&SessionId("no-such-session".to_string()))
        .unwrap()
        .is_none());
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/onboarding/github");
}

/// Test: an unlinked identity whose email matches an account is linked to it
#[tokio::test]
async fn test_email_match_connects_account() {
    let app = create_test_server();
    let user_id = app.users.create_user("kody@example.com", "kody", None).unwrap();
    app.authenticator
        .set_profile(Some(github_profile("1234", "KODY@Example.com", "kody")));

    let response = app.server.get(CALLBACK).await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/settings/profile/connections");

    let connection = app
        .users
        .get_connection(ProviderName::GitHub, "1234")
        .unwrap()
        .expect("connection created");
    assert_eq!(connection.user_id, user_id);
    assert_eq!(app.sessions.sessions_for(user_id).len(), 1);
    assert!(decrypt_cookie(&app.key, &response, SESSION_COOKIE).is_some());

    let toast = response_toast(&app.key, &response).expect("toast set");
    assert_eq!(toast.kind, ToastKind::Success);
    assert_eq!(toast.title.as_deref(), Some("Connected"));
    assert_eq!(
        toast.description,
        "Your \"kody\" GitHub account has been connected."
    );
}

/// Test: a brand-new identity is sent to onboarding with its prefill
#[tokio::test]
async fn test_unknown_identity_goes_to_onboarding() {
    let app = create_test_server();
    app.authenticator
        .set_profile(Some(github_profile("1234", "Kody@Example.com", "Kody.Doe!")));

    let response = app.server.get(CALLBACK).await;

    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/onboarding/github");
    assert_eq!(app.users.connection_count(), 0);
    assert!(app.sessions.is_empty());
    assert!(response.maybe_cookie(SESSION_COOKIE).is_none());

    let raw = decrypt_cookie(&app.key, &response, VERIFICATION_COOKIE).expect("verification");
    let values: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(values["onboardingEmail"], "Kody@Example.com");
    assert_eq!(values["providerId"], "1234");
    assert_eq!(values["providerName"], "github");
    assert_eq!(values["prefilledProfile"]["email"], "kody@example.com");
    assert_eq!(values["prefilledProfile"]["username"], "kodydoe");
    assert_eq!(values["prefilledProfile"]["name"], "Kody Koala");
    assert_eq!(
        values["prefilledProfile"]["image_url"],
        "https://avatars.example/kody.png"
    );
}
