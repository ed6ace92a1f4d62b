/// Authentication endpoints
///
/// Identity lives in the hosted auth service; these handlers call it through
/// the [`AuthProvider`](gello_shared::auth::provider::AuthProvider) seam, keep
/// the local profile row in step, and carry the session in cookies.
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create identity + profile
/// - `POST /api/auth/login` - Password sign-in
/// - `GET /api/auth/session` - Current session, refreshing if needed
/// - `POST /api/auth/refresh` - Explicit refresh
/// - `POST /api/auth/logout` - Sign out and clear cookies

use crate::{
    app::{access_token_from, authenticate, AppState},
    cookies,
    error::{ApiError, ApiResult},
    routes::trimmed,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use gello_shared::{
    auth::provider::{AuthIdentity, AuthProviderError, SignedIn},
    models::user::{CreateUser, User, UserRole},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (the auth service applies its own strength rules on top)
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Display name
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: String,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// The new profile
    pub user: User,

    /// Whether a session was started (false when email confirmation is pending)
    pub session: bool,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login and refresh response
///
/// The token is also set as a cookie; it's returned for clients that send
/// `Authorization: Bearer` instead.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub expires_in: i64,
}

/// Refresh request (optional; the cookie is used when absent)
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Session check response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<User>,
}

impl SessionResponse {
    fn signed_in(user: User) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
        }
    }

    fn signed_out() -> Self {
        Self {
            authenticated: false,
            user: None,
        }
    }
}

fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Loads the caller's profile row, creating it if the identity has none
///
/// New profiles start as `member` with zero points.
async fn ensure_profile(
    state: &AppState,
    identity: &AuthIdentity,
    display_name: &str,
) -> ApiResult<User> {
    if let Some(user) = state.store.find_user(identity.id).await? {
        return Ok(user);
    }

    let user = state
        .store
        .create_user(CreateUser {
            id: identity.id,
            email: identity.email.clone(),
            display_name: display_name.to_string(),
            role: UserRole::Member,
            avatar_url: None,
        })
        .await?;

    tracing::info!(user_id = %user.id, "Created user profile");
    Ok(user)
}

/// Sets cookies for a fresh session and builds the response body
async fn start_session(
    state: &AppState,
    signed_in: SignedIn,
) -> ApiResult<(HeaderMap, Json<LoginResponse>)> {
    let display_name = default_display_name(&signed_in.identity.email);
    let user = ensure_profile(state, &signed_in.identity, &display_name).await?;

    let mut headers = HeaderMap::new();
    cookies::append_session_cookies(&mut headers, &signed_in.tokens, state.secure_cookies())?;

    Ok((
        headers,
        Json(LoginResponse {
            user,
            access_token: signed_in.tokens.access_token,
            expires_in: signed_in.tokens.expires_in,
        }),
    ))
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "correct horse",
///   "display_name": "Ada"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{ "user": {...}, "session": true }`. Session cookies
/// are set when the auth service started a session.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or the auth service refused
/// - `409 Conflict`: Email already registered
/// - `502 Bad Gateway`: Auth service unavailable
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, HeaderMap, Json<RegisterResponse>)> {
    req.validate()?;

    let signed_up = state
        .auth
        .sign_up(&req.email, &req.password, &req.display_name)
        .await?;

    let user = ensure_profile(&state, &signed_up.identity, &req.display_name).await?;

    let mut headers = HeaderMap::new();
    if let Some(tokens) = &signed_up.tokens {
        cookies::append_session_cookies(&mut headers, tokens, state.secure_cookies())?;
    }

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        headers,
        Json(RegisterResponse {
            user,
            session: signed_up.tokens.is_some(),
        }),
    ))
}

/// Password sign-in
///
/// A missing profile row is created on the way (identities created outside
/// this API have none).
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Wrong email or password
/// - `502 Bad Gateway`: Auth service unavailable
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(HeaderMap, Json<LoginResponse>)> {
    req.validate()?;

    let signed_in = state
        .auth
        .sign_in_with_password(&req.email, &req.password)
        .await?;

    tracing::debug!(user_id = %signed_in.identity.id, "User signed in");

    start_session(&state, signed_in).await
}

/// Current session
///
/// Answers `{ "authenticated": false }` rather than 401 so pages can probe it.
/// An expired access cookie is renewed from the refresh cookie; a rejected
/// refresh token clears both cookies.
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(HeaderMap, Json<SessionResponse>)> {
    let mut out = HeaderMap::new();
    let secure = state.secure_cookies();

    if let Some(token) = access_token_from(&headers) {
        match authenticate(&state, &token).await {
            Ok(user) => return Ok((out, Json(SessionResponse::signed_in(user)))),
            Err(ApiError::Unauthorized(_)) => {}
            Err(err) => return Err(err),
        }
    }

    let Some(refresh_token) = cookies::read_cookie(&headers, cookies::REFRESH_COOKIE) else {
        return Ok((out, Json(SessionResponse::signed_out())));
    };

    let signed_in = match state.auth.refresh_session(&refresh_token).await {
        Ok(signed_in) => signed_in,
        Err(AuthProviderError::InvalidRefreshToken) => {
            cookies::append_cleared_session_cookies(&mut out, secure)?;
            return Ok((out, Json(SessionResponse::signed_out())));
        }
        Err(err) => return Err(err.into()),
    };

    let Some(user) = state.store.find_user(signed_in.identity.id).await? else {
        cookies::append_cleared_session_cookies(&mut out, secure)?;
        return Ok((out, Json(SessionResponse::signed_out())));
    };

    cookies::append_session_cookies(&mut out, &signed_in.tokens, secure)?;
    tracing::debug!(user_id = %user.id, "Session refreshed");

    Ok((out, Json(SessionResponse::signed_in(user))))
}

/// Explicit refresh
///
/// Uses `refresh_token` from the body if given, otherwise the cookie.
///
/// # Errors
///
/// - `401 Unauthorized`: No refresh token, or the service rejected it
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(HeaderMap, Json<LoginResponse>)> {
    let refresh_token = body
        .map(|Json(req)| req.refresh_token)
        .or_else(|| cookies::read_cookie(&headers, cookies::REFRESH_COOKIE))
        .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".to_string()))?;

    let signed_in = state.auth.refresh_session(&refresh_token).await?;

    start_session(&state, signed_in).await
}

/// Sign out
///
/// Revocation on the auth service is best effort; the cookies are cleared
/// regardless.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, HeaderMap)> {
    if let Some(token) = access_token_from(&headers) {
        if let Err(err) = state.auth.sign_out(&token).await {
            tracing::warn!(error = %err, "Auth service sign-out failed");
        }
    }

    let mut out = HeaderMap::new();
    cookies::append_cleared_session_cookies(&mut out, state.secure_cookies())?;

    Ok((StatusCode::NO_CONTENT, out))
}
