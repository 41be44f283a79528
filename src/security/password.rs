//! Password hashing with Argon2id.
//!
//! Hashing is CPU-bound, so both functions run on tokio's blocking pool.

use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
};

use crate::error::AppError;

/// Hash a plaintext password into a PHC string (`$argon2id$v=19$...`).
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        // 16 random bytes from the thread-local CSPRNG
        let salt_bytes: [u8; 16] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::Internal(format!("failed to encode salt: {e}")))?;

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
    })
    .await
    .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
}

/// Check a plaintext password against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch; errors only when the stored hash is unreadable.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();

    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|e| AppError::Internal(format!("stored password hash is invalid: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(format!(
                "failed to verify password: {e}"
            ))),
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?
}
