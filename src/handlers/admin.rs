//! Admin HTTP handlers.
//!
//! All routes here sit behind both `auth_middleware` and `require_admin`:
//! - GET /api/v1/admin/users?start=&limit= - Page through users
//! - POST /api/v1/admin/users - Create a verified user
//! - GET /api/v1/admin/users/lookup?email= - Find one user
//! - PUT /api/v1/admin/users/status - Activate or deactivate
//! - PUT /api/v1/admin/users/role - Change role (master-admin only)
//! - GET /api/v1/admin/stats - System counters
//! - GET /api/v1/admin/removal-requests - Pending account removal requests

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    error::AppError,
    extract::{AppJson, AppQuery},
    middleware::auth::AuthContext,
    models::{
        admin::{
            AccountRemovalRequest, EmailQuery, RoleChangeRequest, StatusChangeRequest,
            SystemStats, UserListQuery, UserListResponse,
        },
        user::{RegisterRequest, UserResponse},
    },
    services::admin_service,
    state::AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let users = admin_service::list_users(state.store.as_ref(), query.start, query.limit).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
        start: query.start,
        limit: query.limit,
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    request.validate()?;

    let user = admin_service::create_user(&state, request).await?;
    tracing::info!(actor = %auth.user.id, user_id = %user.id, "admin created user");

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_user(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EmailQuery>,
) -> Result<Json<UserResponse>, AppError> {
    let user = admin_service::get_user_by_email(state.store.as_ref(), &query.email).await?;
    Ok(Json(user.into()))
}

pub async fn change_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<StatusChangeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = admin_service::change_status(
        state.store.as_ref(),
        &auth.user,
        &request.email,
        request.active,
    )
    .await?;
    Ok(Json(user.into()))
}

pub async fn change_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<RoleChangeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user =
        admin_service::change_role(state.store.as_ref(), &auth.user, &request.email, request.role)
            .await?;
    Ok(Json(user.into()))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<SystemStats>, AppError> {
    let stats = admin_service::system_stats(state.store.as_ref()).await?;
    Ok(Json(stats))
}

pub async fn removal_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountRemovalRequest>>, AppError> {
    let requests = admin_service::removal_requests(state.store.as_ref()).await?;
    Ok(Json(requests))
}
