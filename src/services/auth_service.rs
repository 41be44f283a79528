//! Authentication service - registration, login and emailed token flows.
//!
//! This service handles:
//! - Registering users (user row, wallet and verification nonce in one unit)
//! - Email verification and resending of verification links
//! - Login and access token issuance
//! - Password reset requests and single-use password updates
//!
//! # Email Ordering
//!
//! Emails are sent only after the unit that created their token has
//! committed, so a link is never mailed for a token that was rolled back.

use chrono::{Duration, Utc};
use url::Url;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::{
        LoginRequest, NewUser, RegisterRequest, Role, TokenResponse, UpdatePasswordRequest, User,
        normalize_email,
    },
    security::{
        password::{hash_password, verify_password},
        token::TokenPurpose,
    },
    services::email_service::{self, password_reset_email, verification_email},
    state::AppState,
    store::{NewSecurityToken, UnitOfWork},
};

/// Reply to reset and resend requests, identical whether or not the address is known.
pub const EMAIL_SENT_IF_REGISTERED: &str =
    "If the address belongs to an account, an email is on its way";

/// Create an account and its wallet.
///
/// Unverified accounts get a verification nonce in the same unit and the
/// link is emailed after commit. Verified accounts (created by an admin)
/// skip the email.
///
/// # Errors
///
/// - `Conflict`: Email is already registered
/// - `Database`: Database error occurred
pub async fn create_account(
    state: &AppState,
    request: RegisterRequest,
    verified: bool,
    role: Role,
) -> Result<User, AppError> {
    let email = normalize_email(&request.email);
    let name = request.name.trim().to_string();

    // Hash before opening the unit; it is the slow part
    let password_hash = hash_password(&request.password).await?;

    let mut uow = state.store.begin().await?;

    if uow.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }

    let user = uow
        .insert_user(NewUser {
            name,
            email,
            password_hash,
            verified,
            role,
        })
        .await?;

    uow.insert_wallet(user.id, &state.config.default_currency)
        .await?;

    let verification = if verified {
        None
    } else {
        Some(
            issue_single_use(
                uow.as_mut(),
                state,
                user.id,
                TokenPurpose::VerifyEmail,
                state.config.verification_token_ttl_minutes,
            )
            .await?,
        )
    };

    uow.commit().await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user registered");

    if let Some(token) = verification {
        send_verification(state, &user, &token).await?;
    }

    Ok(user)
}

/// Self-service registration: an unverified `user` account.
pub async fn register(state: &AppState, request: RegisterRequest) -> Result<User, AppError> {
    create_account(state, request, false, Role::User).await
}

/// Consume a verification token and mark its user verified.
///
/// Verifying an already verified account succeeds without changes as long
/// as the token itself is still unused.
///
/// # Errors
///
/// - `Token`: Token is malformed, expired, mis-purposed or already used
pub async fn verify_email(state: &AppState, token: &str) -> Result<User, AppError> {
    let (mut uow, user_id) = consume_token(state, token, TokenPurpose::VerifyEmail).await?;

    let user = uow
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let user = if user.verified {
        user
    } else {
        uow.set_user_verified(user_id).await?
    };

    uow.commit().await?;

    tracing::info!(user_id = %user.id, "email verified");
    Ok(user)
}

/// Send a fresh verification link to an unverified account.
///
/// Unknown or already verified addresses get the same reply and no email.
pub async fn resend_verification(state: &AppState, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);

    let mut uow = state.store.begin().await?;
    let user = match uow.find_user_by_email(&email).await? {
        Some(user) if !user.verified => user,
        _ => {
            tracing::info!("verification resend skipped for unknown or verified address");
            return Ok(());
        }
    };

    let token = issue_single_use(
        uow.as_mut(),
        state,
        user.id,
        TokenPurpose::VerifyEmail,
        state.config.verification_token_ttl_minutes,
    )
    .await?;
    uow.commit().await?;

    send_verification(state, &user, &token).await
}

/// Exchange credentials for a bearer token.
///
/// # Errors
///
/// - `Unauthorized`: Unknown email or wrong password (same message for both)
/// - `Permission`: Account is unverified or deactivated
pub async fn login(state: &AppState, request: LoginRequest) -> Result<TokenResponse, AppError> {
    let email = normalize_email(&request.email);

    let mut uow = state.store.begin().await?;
    let user = uow.find_user_by_email(&email).await?;
    uow.commit().await?;

    let Some(user) = user else {
        tracing::warn!("login failed: unknown email");
        return Err(AppError::unauthorized("Incorrect email or password"));
    };

    if !verify_password(&request.password, &user.password_hash).await? {
        tracing::warn!(user_id = %user.id, "login failed: wrong password");
        return Err(AppError::unauthorized("Incorrect email or password"));
    }

    if !user.verified {
        return Err(AppError::permission(
            "User is not verified. Check your email for the verification link.",
        ));
    }
    if !user.active {
        return Err(AppError::permission("User is not active. Access denied."));
    }

    let ttl_minutes = state.config.access_token_ttl_minutes;
    let access_token = state
        .tokens
        .issue_access(user.id, Duration::minutes(ttl_minutes))?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: ttl_minutes * 60,
    })
}

/// Email a single-use password reset link.
///
/// Unknown addresses are not revealed: the caller sees the same outcome
/// either way.
pub async fn request_password_reset(state: &AppState, email: &str) -> Result<(), AppError> {
    let email = normalize_email(email);

    let mut uow = state.store.begin().await?;
    let Some(user) = uow.find_user_by_email(&email).await? else {
        tracing::info!("password reset requested for unknown address");
        return Ok(());
    };

    let ttl_minutes = state.config.password_reset_token_ttl_minutes;
    let token = issue_single_use(
        uow.as_mut(),
        state,
        user.id,
        TokenPurpose::PasswordReset,
        ttl_minutes,
    )
    .await?;
    uow.commit().await?;

    let link = link_with_token(&state.config.frontend_domain, "update-password", &token)?;
    email_service::deliver(
        state.mailer.as_ref(),
        password_reset_email(&user.email, &user.name, &link, ttl_minutes),
    )
    .await;

    tracing::info!(user_id = %user.id, "password reset link issued");
    Ok(())
}

/// Set a new password using a reset token. Each token works once.
///
/// # Errors
///
/// - `Token`: Token is malformed, expired, mis-purposed or already used
pub async fn update_password(
    state: &AppState,
    request: UpdatePasswordRequest,
) -> Result<User, AppError> {
    let password_hash = hash_password(&request.new_password).await?;

    let (mut uow, user_id) =
        consume_token(state, &request.token, TokenPurpose::PasswordReset).await?;
    let user = uow.set_user_password(user_id, &password_hash).await?;
    uow.commit().await?;

    tracing::info!(user_id = %user.id, "password updated");
    Ok(user)
}

/// Verify a single-use token and consume its nonce.
///
/// Returns the still-open unit so the caller's write lands in the same
/// transaction as the consumption.
async fn consume_token(
    state: &AppState,
    token: &str,
    purpose: TokenPurpose,
) -> Result<(Box<dyn UnitOfWork>, Uuid), AppError> {
    let claims = state.tokens.verify(token, purpose)?;
    let nonce = claims
        .nonce
        .ok_or_else(|| AppError::token("Token is not single-use"))?;

    let mut uow = state.store.begin().await?;
    let owner = uow
        .consume_security_token(nonce, purpose)
        .await?
        .ok_or_else(|| AppError::token("Token is invalid, expired or already used"))?;
    if owner != claims.sub {
        return Err(AppError::token("Token is invalid, expired or already used"));
    }

    Ok((uow, owner))
}

/// Persist a nonce and sign a token carrying it.
async fn issue_single_use(
    uow: &mut dyn UnitOfWork,
    state: &AppState,
    user_id: Uuid,
    purpose: TokenPurpose,
    ttl_minutes: i64,
) -> Result<String, AppError> {
    let nonce = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::minutes(ttl_minutes);

    uow.insert_security_token(NewSecurityToken {
        nonce,
        user_id,
        purpose,
        expires_at,
    })
    .await?;

    state
        .tokens
        .issue_single_use(user_id, purpose, nonce, expires_at)
}

async fn send_verification(state: &AppState, user: &User, token: &str) -> Result<(), AppError> {
    let link = link_with_token(
        &state.config.backend_domain,
        "api/v1/auth/verify-email",
        token,
    )?;
    email_service::deliver(
        state.mailer.as_ref(),
        verification_email(&user.email, &user.name, &link),
    )
    .await;
    Ok(())
}

/// `<base>/<path>?token=<token>`, keeping any path prefix already on `base`.
pub fn link_with_token(base: &str, path: &str, token: &str) -> Result<String, AppError> {
    let base = format!("{}/", base.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .and_then(|base| base.join(path))
        .map_err(|e| AppError::Internal(format!("invalid link base {base}: {e}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}
