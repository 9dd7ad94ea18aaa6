//! The `refreshToken` cookie.
//!
//! Scoped to `/api/auth` so the browser only sends it to the refresh endpoint
//! and its siblings. `SameSite=None` needs `Secure`, which is always set.

use axum::http::{HeaderMap, header::COOKIE};
use chrono::Duration;

pub const REFRESH_COOKIE: &str = "refreshToken";
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

pub fn refresh_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{REFRESH_COOKIE}={token}; Path={REFRESH_COOKIE_PATH}; Max-Age={}; Secure; HttpOnly; SameSite=None",
        max_age.num_seconds().max(0)
    )
}

pub fn cleared_refresh_cookie() -> String {
    format!(
        "{REFRESH_COOKIE}=; Path={REFRESH_COOKIE_PATH}; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Secure; HttpOnly; SameSite=None"
    )
}

/// First non-empty `refreshToken` value across all `Cookie` headers.
pub fn refresh_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| token_from_cookie_header(header, REFRESH_COOKIE))
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let value = value.trim();
        (name.trim() == cookie_name && !value.is_empty()).then_some(value)
    })
}
