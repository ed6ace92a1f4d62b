/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`permissions`]: Role predicates and resource-level guards
/// - [`jwt`]: Access-token claims, signing and verification (HS256)
/// - [`csrf`]: Stateless HMAC-signed CSRF tokens
/// - [`password`]: Argon2id hashing for the local auth provider
/// - [`provider`]: The `AuthProvider` seam over the hosted auth service
/// - [`supabase`]: `AuthProvider` backed by the hosted auth HTTP API
/// - [`local`]: In-memory `AuthProvider` for tests and local development
///
/// # Example
///
/// ```
/// use gello_shared::auth::permissions::can_manage_team;
/// use gello_shared::models::user::UserRole;
///
/// assert!(can_manage_team(&UserRole::Admin));
/// assert!(!can_manage_team(&UserRole::parse("bogus-role")));
/// ```

pub mod csrf;
pub mod jwt;
pub mod local;
pub mod password;
pub mod permissions;
pub mod provider;
pub mod supabase;
