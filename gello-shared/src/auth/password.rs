/// Password hashing for the local auth provider, using Argon2id
///
/// Production identities live in the hosted auth service, which owns their
/// password hashes. Only [`LocalAuth`](super::local::LocalAuth) stores
/// passwords itself, and it stores them as PHC strings produced here.
///
/// # Parameters
///
/// | cost                  | memory | passes | lanes |
/// |-----------------------|--------|--------|-------|
/// | [`HashCost::Standard`] | 64 MB  | 3      | 4     |
/// | [`HashCost::Fast`]     | 1 MB   | 1      | 1     |
///
/// `Fast` exists for test suites that register many users; it must not be
/// used for real accounts.
///
/// # Example
///
/// ```
/// use gello_shared::auth::password::{hash_password, verify_password, HashCost};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("super_secret_password_123", HashCost::Fast)?;
///
/// assert!(verify_password("super_secret_password_123", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashCost {
    /// 64 MB, 3 passes, 4 lanes
    #[default]
    Standard,

    /// 1 MB, 1 pass, 1 lane
    Fast,
}

impl HashCost {
    fn params(self) -> (u32, u32, u32) {
        match self {
            HashCost::Standard => (65536, 3, 4),
            HashCost::Fast => (1024, 1, 1),
        }
    }
}

/// Hashes a password with Argon2id and a random 16-byte salt
///
/// Returns a PHC string, e.g. `$argon2id$v=19$m=65536,t=3,p=4$...`.
pub fn hash_password(password: &str, cost: HashCost) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let (m_cost, t_cost, p_cost) = cost.params();
    let params = ParamsBuilder::new()
        .m_cost(m_cost)
        .t_cost(t_cost)
        .p_cost(p_cost)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a PHC hash
///
/// Parameters are read back from the hash, so hashes of either cost verify.
/// Returns `Ok(false)` on mismatch and `Err` only for unusable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}
