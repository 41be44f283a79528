//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the access token from the Authorization header
//! 2. Verify its signature, purpose and expiry
//! 3. Load the user it names and reject deactivated accounts
//! 4. Inject authentication context into the request
//! 5. Reject unauthorized requests with HTTP 401
//!
//! [`require_admin`] runs after it on the admin routes.

use axum::{
    Extension,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::user::User,
    security::token::TokenPurpose,
    services::user_service,
    state::AppState,
};

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The caller, as loaded at the start of the request
    ///
    /// Used to scope queries (e.g., only the caller's own wallet)
    pub user: User,
}

/// Access token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Verify the token was signed by this server for `access` and has not expired
/// 3. Load the user named by the token
/// 4. If found and active: inject `AuthContext` into request, call next handler
/// 5. Otherwise: return 401 Unauthorized error
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer eyJzdWIiOi...<signature>
/// ```
///
/// Unverified users cannot obtain a token in the first place, so only the
/// active flag is re-checked here.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;

    let claims = state
        .tokens
        .verify(token, TokenPurpose::Access)
        .map_err(|_| AppError::unauthorized("Invalid or expired access token"))?;

    let user = user_service::find_user(state.store.as_ref(), claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid or expired access token"))?;

    if !user.active {
        tracing::warn!(user_id = %user.id, "rejected token of deactivated user");
        return Err(AppError::unauthorized("User is not active"));
    }

    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(AuthContext { user });

    Ok(next.run(request).await)
}

/// Admin gate. Must run after [`auth_middleware`].
///
/// # Returns
///
/// - `Ok(Response)` if the caller is `admin` or `master-admin`
/// - `Err(AppError::Permission)` otherwise (returns 403)
pub async fn require_admin(
    Extension(auth): Extension<AuthContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !auth.user.role.is_admin() {
        tracing::warn!(user_id = %auth.user.id, "non-admin attempted admin route");
        return Err(AppError::permission(
            "You are not allowed to access this resource",
        ));
    }

    Ok(next.run(request).await)
}
