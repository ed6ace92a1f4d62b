/// Identity provider seam
///
/// Sign-up, password sign-in, refresh, sign-out and account deletion are
/// delegated to an [`AuthProvider`]. Access tokens issued by any provider are
/// HS256 JWTs signed with the project JWT secret and are verified locally
/// with [`jwt::validate_token`](super::jwt::validate_token); providers are
/// never called to authenticate an ordinary request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for identity provider calls
#[derive(Debug, thiserror::Error)]
pub enum AuthProviderError {
    /// Email/password pair rejected
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Email already registered
    #[error("A user with this email already exists")]
    DuplicateUser,

    /// Refresh token unknown, revoked or expired
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    /// Identity doesn't exist
    #[error("User not found")]
    UserNotFound,

    /// Request refused for another reason (weak password, bad email, ...)
    #[error("Rejected by auth service: {0}")]
    Rejected(String),

    /// Auth service unreachable or failing
    #[error("Auth service error: {0}")]
    Upstream(String),
}

/// Identity as known to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    /// Identity ID, reused as the profile row ID
    pub id: Uuid,

    /// Email
    pub email: String,
}

/// Session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    /// Short-lived JWT
    pub access_token: String,

    /// Opaque refresh token
    pub refresh_token: String,

    /// Access-token lifetime in seconds
    pub expires_in: i64,
}

/// Result of a sign-up
///
/// `tokens` is `None` when the provider requires email confirmation before
/// it hands out a session.
#[derive(Debug, Clone)]
pub struct SignedUp {
    pub identity: AuthIdentity,
    pub tokens: Option<AuthTokens>,
}

/// Result of a sign-in or refresh
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub identity: AuthIdentity,
    pub tokens: AuthTokens,
}

/// Identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an identity
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignedUp, AuthProviderError>;

    /// Exchanges an email/password pair for a session
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AuthProviderError>;

    /// Exchanges a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> Result<SignedIn, AuthProviderError>;

    /// Revokes the session behind an access token
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError>;

    /// Deletes an identity (service-role operation)
    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthProviderError>;
}
