//! Credential hashing
//!
//! Passwords are stored as Argon2id PHC strings. Hashing and verification
//! run on tokio's blocking pool.

use argon2::password_hash::{self, rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The stored credential is not a PHC string
    #[error("stored password hash is malformed")]
    MalformedHash,

    #[error("password worker failed: {0}")]
    Worker(String),
}

/// Hash `password` into a salted Argon2id PHC string.
///
/// ```
/// # #[tokio::main]
/// # async fn main() {
/// use finance_ledger::identity::{hash_password, verify_password};
///
/// let hash = hash_password("my_secure_password").await.unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// assert!(verify_password("my_secure_password", &hash).await.unwrap());
/// # }
/// ```
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_owned();
    on_blocking_pool(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    })
    .await
}

/// `Ok(false)` for a wrong password; errors are reserved for unusable hashes.
pub async fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let password = password.to_owned();
    let stored = stored.to_owned();
    on_blocking_pool(move || {
        let parsed = PasswordHash::new(&stored).map_err(|_| PasswordError::MalformedHash)?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Hashing(e.to_string())),
        }
    })
    .await
}

async fn on_blocking_pool<T, F>(work: F) -> Result<T, PasswordError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PasswordError::Worker(e.to_string()))?
}
