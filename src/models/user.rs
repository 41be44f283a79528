//! User data models and auth/profile request bodies.
//!
//! This module defines:
//! - `User`: Database entity representing an account holder
//! - `Role`: Authorization level stored on each user
//! - Request bodies for registration, login, verification and password reset
//! - `UserResponse`: Public view of a user returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;
use crate::error::AppError;

/// Authorization level of a user.
///
/// Stored as text in the `users.role` column (`user`, `admin`, `master-admin`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Admin,
    MasterAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::MasterAdmin => "master-admin",
        }
    }

    /// Whether this role may call `/api/v1/admin` endpoints.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::MasterAdmin)
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "master-admin" => Ok(Role::MasterAdmin),
            _ => Err(UnknownVariant { kind: "role", value }),
        }
    }
}

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Each user:
/// - Owns exactly one wallet, created at registration
/// - Starts unverified until the emailed link is followed
/// - Is never deleted; admins set `active = false` instead
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub name: String,

    /// Lowercased, trimmed email address (unique)
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    /// Set once the email verification link has been used
    pub verified: bool,

    /// Cleared when an admin disables the account
    pub active: bool,

    #[sqlx(try_from = "String")]
    pub role: Role,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Wallet operations require an account that is both active and verified.
    pub fn ensure_can_transact(&self) -> Result<(), AppError> {
        if !self.active {
            return Err(AppError::permission("User is not active. Access denied."));
        }
        if !self.verified {
            return Err(AppError::permission("User is not verified. Access denied."));
        }
        Ok(())
    }
}

/// Values needed to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    pub role: Role,
}

/// Public view of a user.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "0be69ca0-6084-41d6-9efa-8ecd99811075",
///   "name": "John Doe",
///   "email": "john_doe@example.com",
///   "role": "user",
///   "verified": true,
///   "active": true,
///   "created_at": "2025-02-18T00:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub verified: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Convert database User to API UserResponse (drops the password hash).
impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            verified: user.verified,
            active: user.active,
            created_at: user.created_at,
        }
    }
}

/// Request body for `POST /api/v1/auth/register` and admin user creation.
///
/// # Validation
///
/// - `name`: 3 to 50 characters
/// - `email`: valid address, stored lowercased
/// - `password`: 8 to 100 characters
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Bearer token returned on successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime of the token in seconds
    pub expires_in: i64,
}

/// Token carried by an emailed verification link.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Body for endpoints addressed by email only (reset request, resend verification).
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Request body for `POST /api/v1/auth/update-user-password`.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub token: String,
    pub new_password: String,
}

impl UpdatePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.token.trim().is_empty() {
            return Err(AppError::token("Token is required"));
        }
        validate_password(&self.new_password)
    }
}

/// Request body for `PUT /api/v1/users/me`.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)
    }
}

/// Request body for `POST /api/v1/users/me/request-account-removal`.
#[derive(Debug, Default, Deserialize)]
pub struct AccountRemovalBody {
    pub details: Option<String>,
}

impl AccountRemovalBody {
    pub fn validate(&self) -> Result<(), AppError> {
        match self.details {
            Some(ref details) if details.chars().count() > MAX_DETAILS_LEN => Err(
                AppError::validation(format!("Details must be at most {MAX_DETAILS_LEN} characters")),
            ),
            _ => Ok(()),
        }
    }
}

const MAX_DETAILS_LEN: usize = 500;

/// Canonical form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_name(name: &str) -> Result<(), AppError> {
    let len = name.trim().chars().count();
    if !(3..=50).contains(&len) {
        return Err(AppError::validation(
            "Name must be between 3 and 50 characters",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if !email_address::EmailAddress::is_valid(email.trim()) {
        return Err(AppError::validation("Email address is not valid"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(8..=100).contains(&len) {
        return Err(AppError::validation(
            "Password must be between 8 and 100 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn register_request_accepts_valid_input() {
        assert!(register("Jane Doe", "jane@example.com", "correct horse").validate().is_ok());
    }

    #[test]
    fn register_request_rejects_bad_fields() {
        assert!(matches!(
            register("Jo", "jane@example.com", "correct horse").validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register("Jane", "not-an-email", "correct horse").validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register("Jane", "jane@example.com", "short").validate(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::User, Role::Admin, Role::MasterAdmin] {
            assert_eq!(Role::try_from(role.as_str().to_string()).unwrap(), role);
        }
        assert!(Role::try_from("root".to_string()).is_err());
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }
}
