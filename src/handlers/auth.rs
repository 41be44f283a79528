//! Authentication HTTP handlers.
//!
//! This module implements the public auth endpoints:
//! - POST /api/v1/auth/register - Create an account and its wallet
//! - GET /api/v1/auth/verify-email?token= - Follow the emailed verification link
//! - POST /api/v1/auth/verify-email - Same, with the token in a JSON body
//! - POST /api/v1/auth/resend-verification - Mail a fresh verification link
//! - POST /api/v1/auth/login - Exchange credentials for a bearer token
//! - POST /api/v1/auth/request-password-reset - Mail a reset link
//! - POST /api/v1/auth/update-user-password - Set a new password with a reset token
//! - GET /api/v1/auth/password-update-confirm - Static confirmation page

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::Html,
};

use crate::{
    error::AppError,
    extract::{AppJson, AppQuery},
    models::{
        MessageResponse,
        user::{
            EmailRequest, LoginRequest, RegisterRequest, TokenResponse, UpdatePasswordRequest,
            UserResponse, VerifyEmailRequest, validate_email,
        },
    },
    services::{
        auth_service::{self, EMAIL_SENT_IF_REGISTERED},
        email_service::escape_html,
    },
    state::AppState,
};

/// Register a new account.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "John Doe",
///   "email": "john_doe@example.com",
///   "password": "correct horse battery"
/// }
/// ```
///
/// # Response (201)
///
/// The created user (unverified). A verification link is emailed.
///
/// # Errors
///
/// - 400: Invalid name, email or password
/// - 409: Email already registered
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    request.validate()?;

    let user = auth_service::register(&state, request).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Verify an email address from the link in the verification email.
///
/// Opened in a browser, so success is an HTML page. Failures keep the JSON
/// error body.
pub async fn verify_email_link(
    State(state): State<AppState>,
    AppQuery(request): AppQuery<VerifyEmailRequest>,
) -> Result<Html<String>, AppError> {
    let user = auth_service::verify_email(&state, &request.token).await?;
    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Email verified</title></head>
<body style="font-family: Arial, sans-serif; text-align: center; padding: 40px;">
  <h2>Welcome, {name}</h2>
  <p>Your email address has been verified. You can now log in.</p>
  <p><a href="{frontend}/login">Go to login</a></p>
</body>
</html>"#,
        name = escape_html(&user.name),
        frontend = state.config.frontend_domain.trim_end_matches('/'),
    )))
}

/// Verify an email address with the token in a JSON body.
pub async fn verify_email(
    State(state): State<AppState>,
    AppJson(request): AppJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_service::verify_email(&state, &request.token).await?;
    Ok(Json(MessageResponse::new("Email verified. You can now log in.")))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    AppJson(request): AppJson<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_email(&request.email)?;
    auth_service::resend_verification(&state, &request.email).await?;
    Ok(Json(MessageResponse::new(EMAIL_SENT_IF_REGISTERED)))
}

/// Log in.
///
/// # Response (200)
///
/// ```json
/// {
///   "access_token": "eyJhbGciOi...",
///   "token_type": "Bearer",
///   "expires_in": 3600
/// }
/// ```
///
/// # Errors
///
/// - 401: Unknown email or wrong password
/// - 403: Account not verified or deactivated
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let response = auth_service::login(&state, request).await?;
    Ok(Json(response))
}

/// Request a password reset link.
///
/// Always answers 200 with the same message so the endpoint cannot be used
/// to discover which addresses are registered.
pub async fn request_password_reset(
    State(state): State<AppState>,
    AppJson(request): AppJson<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_email(&request.email)?;
    auth_service::request_password_reset(&state, &request.email).await?;
    Ok(Json(MessageResponse::new(EMAIL_SENT_IF_REGISTERED)))
}

/// Set a new password using the emailed reset token.
///
/// # Errors
///
/// - 400 `invalid_token`: Token invalid, expired or already used
/// - 400 `validation_error`: New password too short or too long
pub async fn update_user_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate()?;
    auth_service::update_password(&state, request).await?;
    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Page shown after a successful password change in the web client.
pub async fn password_update_confirm(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Password updated</title></head>
<body style="font-family: Arial, sans-serif; text-align: center; padding: 40px;">
  <h2>Your password has been updated</h2>
  <p>You can now log in with your new password.</p>
  <p>Didn't change your password? Contact <a href="mailto:{support}">{support}</a>.</p>
</body>
</html>"#,
        support = state.config.support_email
    ))
}
