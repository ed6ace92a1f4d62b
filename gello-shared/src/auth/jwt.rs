/// Access-token claims, signing and verification
///
/// Access tokens are issued by the hosted auth service and verified here with
/// the project's shared JWT secret. The same functions sign tokens for the
/// in-memory [`LocalAuth`](super::local::LocalAuth) provider, so both paths
/// produce tokens of identical shape.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Audience**: always `"authenticated"`
/// - **Validation**: Signature, expiration and audience checks
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use gello_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "a-project-jwt-secret-of-at-least-32-bytes";
///
/// let claims = Claims::new(user_id, "ada@example.com", Duration::hours(1));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience claim carried by every user access token
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was minted for another audience
    #[error("Invalid audience: expected {expected}")]
    InvalidAudience { expected: String },
}

/// Access-token claims
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID, shared by the auth identity and the profile row)
/// - `aud`: Audience (`"authenticated"`)
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
///
/// # Custom Claims
///
/// - `email`: Identity email
/// - `role`: Database role of the token, not the application role. The
///   application role always comes from the profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Identity email
    #[serde(default)]
    pub email: String,

    /// Database role (`"authenticated"`)
    #[serde(default)]
    pub role: String,

    /// Audience
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for an authenticated user, valid for `expires_in`
    pub fn new(user_id: Uuid, email: &str, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            email: email.to_string(),
            role: AUTHENTICATED_AUDIENCE.to_string(),
            aud: AUTHENTICATED_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token creation fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates an access token and extracts its claims
///
/// Verifies:
/// - Signature is valid
/// - Token hasn't expired (no leeway)
/// - Audience is `"authenticated"`
///
/// # Errors
///
/// Returns `JwtError::Expired` for expired tokens,
/// `JwtError::InvalidAudience` for foreign tokens and
/// `JwtError::ValidationError` for everything else.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience {
            expected: AUTHENTICATED_AUDIENCE.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
