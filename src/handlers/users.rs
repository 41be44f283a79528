//! Endpoints acting on the authenticated caller's own account.
//!
//! - GET /api/v1/users/me - Profile
//! - PUT /api/v1/users/me - Change display name
//! - POST /api/v1/users/me/request-password-reset - Email a reset link to the caller
//! - POST /api/v1/users/me/request-account-removal - Ask for the account to be removed

use axum::{Extension, Json, body::Bytes, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::{
        MessageResponse,
        admin::AccountRemovalRequest,
        user::{AccountRemovalBody, UpdateProfileRequest, UserResponse},
    },
    services::{auth_service, user_service},
    state::AppState,
};

pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<UserResponse> {
    Json(auth.user.into())
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    request.validate()?;
    let user = user_service::update_profile(state.store.as_ref(), auth.user.id, &request.name)
        .await?;
    Ok(Json(user.into()))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_service::request_password_reset(&state, &auth.user.email).await?;
    Ok(Json(MessageResponse::new(
        "A password reset link has been sent to your email",
    )))
}

/// Record an account removal request.
///
/// # Request Body (optional)
///
/// ```json
/// { "details": "Moving to another provider" }
/// ```
///
/// # Response (202)
///
/// The recorded request with status `pending`.
pub async fn request_account_removal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccountRemovalRequest>), AppError> {
    let body: AccountRemovalBody = if body.is_empty() {
        AccountRemovalBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))?
    };
    body.validate()?;

    let request =
        user_service::request_account_removal(&state, &auth.user, body.details).await?;
    Ok((StatusCode::ACCEPTED, Json(request)))
}
