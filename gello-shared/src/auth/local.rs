/// In-memory [`AuthProvider`] for tests and local development
///
/// Identities live in process memory with Argon2id password hashes. Access
/// tokens are signed with the same JWT secret and carry the same claims as
/// tokens from the hosted service, so the session layer can't tell the two
/// providers apart. Refresh tokens are random, single use, and rotated on
/// every refresh.
///
/// # Example
///
/// ```
/// use gello_shared::auth::local::LocalAuth;
/// use gello_shared::auth::password::HashCost;
/// use gello_shared::auth::provider::AuthProvider;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = LocalAuth::new("a-project-jwt-secret-of-at-least-32-bytes")
///     .with_hash_cost(HashCost::Fast);
///
/// auth.sign_up("ada@example.com", "correct horse", "Ada").await?;
/// let session = auth.sign_in_with_password("ada@example.com", "correct horse").await?;
/// assert!(!session.tokens.access_token.is_empty());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Duration;
use rand::RngCore;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::jwt::{create_token, validate_token, Claims};
use super::password::{hash_password, verify_password, HashCost};
use super::provider::{
    AuthIdentity, AuthProvider, AuthProviderError, AuthTokens, SignedIn, SignedUp,
};

/// Shortest password the hosted service accepts by default
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Default access-token lifetime
pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 3600;

#[derive(Debug, Clone)]
struct LocalIdentity {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(Debug, Default)]
struct LocalState {
    /// Keyed by lowercased email
    identities: HashMap<String, LocalIdentity>,

    /// Refresh token -> identity ID
    refresh_tokens: HashMap<String, Uuid>,
}

/// In-memory identity provider
#[derive(Debug)]
pub struct LocalAuth {
    jwt_secret: String,
    access_ttl: Duration,
    hash_cost: HashCost,
    state: RwLock<LocalState>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl LocalAuth {
    /// Creates an empty provider signing with `jwt_secret`
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            jwt_secret: jwt_secret.to_string(),
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECONDS),
            hash_cost: HashCost::default(),
            state: RwLock::new(LocalState::default()),
        }
    }

    /// Sets the Argon2id work factor for new identities
    pub fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Sets the access-token lifetime
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Number of live refresh tokens (all identities)
    pub async fn active_sessions(&self) -> usize {
        self.state.read().await.refresh_tokens.len()
    }

    fn issue(&self, identity: &LocalIdentity, state: &mut LocalState) -> Result<SignedIn, AuthProviderError> {
        let claims = Claims::new(identity.id, &identity.email, self.access_ttl);
        let access_token = create_token(&claims, &self.jwt_secret)
            .map_err(|e| AuthProviderError::Upstream(e.to_string()))?;

        let refresh_token = new_refresh_token();
        state.refresh_tokens.insert(refresh_token.clone(), identity.id);

        Ok(SignedIn {
            identity: AuthIdentity {
                id: identity.id,
                email: identity.email.clone(),
            },
            tokens: AuthTokens {
                access_token,
                refresh_token,
                expires_in: self.access_ttl.num_seconds(),
            },
        })
    }
}

#[async_trait]
impl AuthProvider for LocalAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _display_name: &str,
    ) -> Result<SignedUp, AuthProviderError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthProviderError::Rejected(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let key = normalize_email(email);
        let password_hash = hash_password(password, self.hash_cost)
            .map_err(|e| AuthProviderError::Upstream(e.to_string()))?;

        let mut state = self.state.write().await;
        if state.identities.contains_key(&key) {
            return Err(AuthProviderError::DuplicateUser);
        }

        let identity = LocalIdentity {
            id: Uuid::new_v4(),
            email: key.clone(),
            password_hash,
        };
        state.identities.insert(key, identity.clone());

        let signed_in = self.issue(&identity, &mut state)?;

        tracing::debug!(user_id = %identity.id, "Local identity created");

        Ok(SignedUp {
            identity: signed_in.identity,
            tokens: Some(signed_in.tokens),
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignedIn, AuthProviderError> {
        let key = normalize_email(email);

        let identity = self
            .state
            .read()
            .await
            .identities
            .get(&key)
            .cloned()
            .ok_or(AuthProviderError::InvalidCredentials)?;

        let matches = verify_password(password, &identity.password_hash)
            .map_err(|e| AuthProviderError::Upstream(e.to_string()))?;
        if !matches {
            return Err(AuthProviderError::InvalidCredentials);
        }

        let mut state = self.state.write().await;
        self.issue(&identity, &mut state)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<SignedIn, AuthProviderError> {
        let mut state = self.state.write().await;

        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(AuthProviderError::InvalidRefreshToken)?;

        let identity = state
            .identities
            .values()
            .find(|identity| identity.id == user_id)
            .cloned()
            .ok_or(AuthProviderError::InvalidRefreshToken)?;

        self.issue(&identity, &mut state)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError> {
        // an invalid or expired token has no session left to revoke
        let Ok(claims) = validate_token(access_token, &self.jwt_secret) else {
            return Ok(());
        };

        self.state
            .write()
            .await
            .refresh_tokens
            .retain(|_, user_id| *user_id != claims.sub);

        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthProviderError> {
        let mut state = self.state.write().await;

        let before = state.identities.len();
        state.identities.retain(|_, identity| identity.id != user_id);
        if state.identities.len() == before {
            return Err(AuthProviderError::UserNotFound);
        }

        state.refresh_tokens.retain(|_, id| *id != user_id);

        Ok(())
    }
}
