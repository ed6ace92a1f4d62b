/// CSRF token endpoint
///
/// ```text
/// GET /api/csrf-token
/// ```
///
/// Issues a fresh token, returns it in the body and sets it as the
/// `gello-csrf` cookie. Clients echo it in `X-CSRF-Token` on mutating calls.

use crate::{app::AppState, cookies, error::ApiResult};
use axum::{extract::State, http::HeaderMap, Json};
use gello_shared::auth::csrf::issue_token;
use serde::{Deserialize, Serialize};

/// CSRF token response
#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

pub async fn csrf_token(
    State(state): State<AppState>,
) -> ApiResult<(HeaderMap, Json<CsrfTokenResponse>)> {
    let token = issue_token(state.csrf_secret());

    let mut headers = HeaderMap::new();
    cookies::append_cookie(
        &mut headers,
        cookies::CSRF_COOKIE,
        &token,
        None,
        state.secure_cookies(),
    )?;

    Ok((headers, Json(CsrfTokenResponse { csrf_token: token })))
}
