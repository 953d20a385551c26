//! Login session cookie and the hand-off that completes a login

use axum::response::{IntoResponse, Redirect, Response};
use tower_cookies::cookie::time::OffsetDateTime;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

use crate::error::WebError;
use crate::store::{Session, SessionId, SessionStore, StoreResult, UserId};

pub const SESSION_COOKIE: &str = "en_session";

/// Where logins land when no other target was requested
pub const DEFAULT_REDIRECT: &str = "/";

/// Only same-site absolute paths are followed
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

/// Helper to get the current, unexpired session from cookies.
/// An expired session is deleted from the store on sight.
pub fn get_session_from_cookies<S: SessionStore + ?Sized>(
    cookies: &Cookies,
    key: &Key,
    session_store: &S,
) -> StoreResult<Option<Session>> {
    let Some(cookie) = cookies.private(key).get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let session_id = SessionId(cookie.value().to_string());
    match session_store.get(&session_id)? {
        Some(session) if session.is_expired() => {
            tracing::debug!(user_id = session.user_id.0, "Dropping expired session");
            session_store.delete(&session.id)?;
            Ok(None)
        }
        other => Ok(other),
    }
}

/// The authenticated user making this request, if any
pub fn current_user_id<S: SessionStore + ?Sized>(
    cookies: &Cookies,
    key: &Key,
    session_store: &S,
) -> StoreResult<Option<UserId>> {
    Ok(get_session_from_cookies(cookies, key, session_store)?.map(|s| s.user_id))
}

/// Helper to set session cookie. A remembered session outlives the browser
/// session and expires with the stored session.
pub fn set_session_cookie(
    cookies: &Cookies,
    key: &Key,
    session: &Session,
    remember: bool,
) -> Result<(), WebError> {
    let mut cookie = Cookie::build((SESSION_COOKIE, session.id.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    if remember {
        let expires = OffsetDateTime::from_unix_timestamp(session.expiration_date.timestamp())
            .map_err(|e| WebError::Internal(e.to_string()))?;
        cookie.set_expires(expires);
    }
    cookies.private(key).add(cookie);
    Ok(())
}

/// Finish a login: issue the session cookie and redirect to `redirect_to`
/// when it is safe, otherwise home.
pub fn handle_new_session(
    cookies: &Cookies,
    key: &Key,
    session: &Session,
    redirect_to: Option<&str>,
    remember: bool,
) -> Result<Response, WebError> {
    set_session_cookie(cookies, key, session, remember)?;
    let target = redirect_to
        .filter(|t| is_safe_redirect(t))
        .unwrap_or(DEFAULT_REDIRECT);
    tracing::debug!(user_id = session.user_id.0, %target, "Session established");
    Ok(Redirect::to(target).into_response())
}
