/// Session and CSRF cookies
///
/// All cookies are `HttpOnly; SameSite=Lax; Path=/`, and `Secure` when the
/// server runs in production mode. Clearing a cookie re-sends it empty with
/// `Max-Age=0`.
///
/// | cookie             | holds                  | lifetime |
/// |--------------------|------------------------|----------|
/// | `sb-access-token`  | access JWT             | 1 hour   |
/// | `sb-refresh-token` | refresh token          | 7 days   |
/// | `gello-csrf`       | CSRF token             | session  |

use axum::http::{header, HeaderMap, HeaderValue};
use gello_shared::auth::provider::AuthTokens;

use crate::error::{ApiError, ApiResult};

/// Access token cookie
pub const ACCESS_COOKIE: &str = "sb-access-token";

/// Refresh token cookie
pub const REFRESH_COOKIE: &str = "sb-refresh-token";

/// CSRF token cookie
pub const CSRF_COOKIE: &str = "gello-csrf";

/// Access cookie lifetime (seconds)
pub const ACCESS_MAX_AGE: i64 = 3600;

/// Refresh cookie lifetime (seconds)
pub const REFRESH_MAX_AGE: i64 = 604_800;

/// Formats a `Set-Cookie` value
///
/// `max_age = None` makes a browser-session cookie.
pub fn format_cookie(name: &str, value: &str, max_age: Option<i64>, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);

    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if secure {
        cookie.push_str("; Secure");
    }

    cookie
}

/// Appends a `Set-Cookie` header
pub fn append_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    max_age: Option<i64>,
    secure: bool,
) -> ApiResult<()> {
    let cookie = format_cookie(name, value, max_age, secure);
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie value: {}", e)))?;

    headers.append(header::SET_COOKIE, value);
    Ok(())
}

/// Sets both session cookies from a provider session
pub fn append_session_cookies(
    headers: &mut HeaderMap,
    tokens: &AuthTokens,
    secure: bool,
) -> ApiResult<()> {
    append_cookie(headers, ACCESS_COOKIE, &tokens.access_token, Some(ACCESS_MAX_AGE), secure)?;
    append_cookie(headers, REFRESH_COOKIE, &tokens.refresh_token, Some(REFRESH_MAX_AGE), secure)
}

/// Expires both session cookies
pub fn append_cleared_session_cookies(headers: &mut HeaderMap, secure: bool) -> ApiResult<()> {
    append_cookie(headers, ACCESS_COOKIE, "", Some(0), secure)?;
    append_cookie(headers, REFRESH_COOKIE, "", Some(0), secure)
}

/// Reads a cookie from the request's `Cookie` headers
///
/// Empty values count as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
