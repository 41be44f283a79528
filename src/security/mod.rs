//! Security utilities: password hashing and signed tokens.

/// Argon2id password hashing
pub mod password;
/// JWT access, verification and reset tokens
pub mod token;
