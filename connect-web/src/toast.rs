//! Toast notifications carried across a redirect in a private cookie

use connect_core::Toast;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

use crate::error::WebError;

pub const TOAST_COOKIE: &str = "en_toast";

/// Queue a toast for the next page the user lands on
pub fn set_toast(cookies: &Cookies, key: &Key, toast: &Toast) -> Result<(), WebError> {
    let payload = toast.to_json()?;
    let cookie = Cookie::build((TOAST_COOKIE, payload))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookies.private(key).add(cookie);
    Ok(())
}
