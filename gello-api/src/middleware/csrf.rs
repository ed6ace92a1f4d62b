/// CSRF middleware
///
/// Every `POST`, `PUT`, `PATCH` and `DELETE` must carry the token from the
/// `gello-csrf` cookie in the `X-CSRF-Token` header, and the token must carry
/// a valid MAC. Safe methods pass through untouched. Tokens are issued by
/// `GET /api/csrf-token`.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use gello_shared::auth::csrf::verify_double_submit;

use crate::{app::AppState, cookies, error::ApiError};

/// Header the client echoes the token in
pub const CSRF_HEADER: &str = "x-csrf-token";

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Rejects mutating requests without a matching, valid token
pub async fn csrf_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_safe(req.method()) {
        return Ok(next.run(req).await);
    }

    let cookie = cookies::read_cookie(req.headers(), cookies::CSRF_COOKIE);
    let header = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(err) = verify_double_submit(state.csrf_secret(), cookie.as_deref(), header) {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            reason = %err,
            "Rejected request failing CSRF check"
        );
        return Err(err.into());
    }

    Ok(next.run(req).await)
}
