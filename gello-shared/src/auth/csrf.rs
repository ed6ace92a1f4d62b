/// Stateless CSRF tokens
///
/// A token is `<nonce>.<mac>` where `nonce` is 32 random bytes and `mac` is
/// HMAC-SHA256 of the nonce under the server's CSRF secret, both hex encoded.
/// Any instance holding the secret can check a token without shared state.
///
/// The HTTP layer uses the double-submit pattern: the token is set as a cookie
/// and must be echoed back in the `X-CSRF-Token` header on every mutating
/// request. [`verify_double_submit`] checks both halves.
///
/// # Example
///
/// ```
/// use gello_shared::auth::csrf::{issue_token, verify_double_submit};
///
/// let secret = "csrf-secret-of-at-least-thirty-two-bytes";
/// let token = issue_token(secret);
///
/// assert!(verify_double_submit(secret, Some(&token), Some(&token)).is_ok());
/// assert!(verify_double_submit(secret, Some(&token), None).is_err());
/// ```

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const NONCE_BYTES: usize = 32;

/// Error type for CSRF checks
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CsrfError {
    /// No token cookie on the request
    #[error("CSRF cookie missing")]
    MissingCookie,

    /// No token header on the request
    #[error("CSRF token header missing")]
    MissingHeader,

    /// Header and cookie carry different tokens
    #[error("CSRF token mismatch")]
    Mismatch,

    /// Token wasn't issued with this secret
    #[error("CSRF token invalid")]
    Invalid,
}

fn mac_for(secret: &str, nonce: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(nonce);
    mac
}

/// Issues a new token
pub fn issue_token(secret: &str) -> String {
    let mut nonce = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut nonce);

    let tag = mac_for(secret, &nonce).finalize().into_bytes();

    format!("{}.{}", hex::encode(nonce), hex::encode(tag))
}

/// Checks that `token` was issued with `secret`
///
/// The MAC comparison is constant time.
pub fn verify_token(secret: &str, token: &str) -> Result<(), CsrfError> {
    let (nonce_hex, tag_hex) = token.split_once('.').ok_or(CsrfError::Invalid)?;

    let nonce = hex::decode(nonce_hex).map_err(|_| CsrfError::Invalid)?;
    let tag = hex::decode(tag_hex).map_err(|_| CsrfError::Invalid)?;

    if nonce.len() != NONCE_BYTES {
        return Err(CsrfError::Invalid);
    }

    mac_for(secret, &nonce)
        .verify_slice(&tag)
        .map_err(|_| CsrfError::Invalid)
}

/// Checks a double-submitted token: both present, equal, and valid
pub fn verify_double_submit(
    secret: &str,
    cookie: Option<&str>,
    header: Option<&str>,
) -> Result<(), CsrfError> {
    let cookie = cookie.ok_or(CsrfError::MissingCookie)?;
    let header = header.ok_or(CsrfError::MissingHeader)?;

    if cookie != header {
        return Err(CsrfError::Mismatch);
    }

    verify_token(secret, header)
}
