//! Administrative operations.
//!
//! Route-level middleware already restricts these to `admin` and
//! `master-admin` callers; this module enforces the finer rules:
//! - Only a master admin may change roles
//! - Nobody may deactivate or re-role their own account

use crate::{
    error::AppError,
    models::{
        admin::{AccountRemovalRequest, MAX_PAGE_SIZE, SystemStats},
        user::{RegisterRequest, Role, User, normalize_email},
    },
    services::auth_service,
    state::AppState,
    store::Store,
};

/// Page of users ordered by registration time.
///
/// An offset past the end yields an empty page, not an error.
///
/// # Errors
///
/// - `Validation`: `start` is negative or `limit` is outside 1..=100
pub async fn list_users(store: &dyn Store, start: i64, limit: i64) -> Result<Vec<User>, AppError> {
    if start < 0 {
        return Err(AppError::validation("start must not be negative"));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::validation(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let mut uow = store.begin().await?;
    let users = uow.list_users(start, limit).await?;
    uow.commit().await?;
    Ok(users)
}

pub async fn get_user_by_email(store: &dyn Store, email: &str) -> Result<User, AppError> {
    let mut uow = store.begin().await?;
    let user = uow
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or(AppError::NotFound("User"))?;
    uow.commit().await?;
    Ok(user)
}

/// Activate or deactivate an account.
///
/// Deactivated users cannot log in, and tokens they already hold stop working.
pub async fn change_status(
    store: &dyn Store,
    actor: &User,
    email: &str,
    active: bool,
) -> Result<User, AppError> {
    let mut uow = store.begin().await?;
    let target = uow
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if target.id == actor.id {
        return Err(AppError::validation("You cannot change your own status"));
    }
    if target.active == active {
        return Err(AppError::validation(format!(
            "User is already {}",
            if active { "active" } else { "inactive" }
        )));
    }
    if target.role == Role::MasterAdmin && actor.role != Role::MasterAdmin {
        return Err(AppError::permission(
            "Only a master admin can change the status of a master admin",
        ));
    }

    let user = uow.set_user_active(target.id, active).await?;
    uow.commit().await?;

    tracing::info!(actor = %actor.id, target = %user.id, active, "user status changed");
    Ok(user)
}

/// Change an account's role.
///
/// # Errors
///
/// - `Permission`: Caller is not a master admin
/// - `Validation`: Caller targets their own account, or the role is unchanged
/// - `NotFound`: No user has that email
pub async fn change_role(
    store: &dyn Store,
    actor: &User,
    email: &str,
    role: Role,
) -> Result<User, AppError> {
    if actor.role != Role::MasterAdmin {
        return Err(AppError::permission("Only a master admin can change roles"));
    }

    let mut uow = store.begin().await?;
    let target = uow
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if target.id == actor.id {
        return Err(AppError::validation("You cannot change your own role"));
    }
    if target.role == role {
        return Err(AppError::validation(format!(
            "User already has the {} role",
            role.as_str()
        )));
    }

    let user = uow.set_user_role(target.id, role).await?;
    uow.commit().await?;

    tracing::info!(actor = %actor.id, target = %user.id, role = role.as_str(), "user role changed");
    Ok(user)
}

/// Create an already verified `user` account (with wallet) on someone's behalf.
pub async fn create_user(state: &AppState, request: RegisterRequest) -> Result<User, AppError> {
    auth_service::create_account(state, request, true, Role::User).await
}

pub async fn system_stats(store: &dyn Store) -> Result<SystemStats, AppError> {
    let mut uow = store.begin().await?;
    let stats = uow.system_stats().await?;
    uow.commit().await?;
    Ok(stats)
}

/// Account removal requests, newest first.
pub async fn removal_requests(store: &dyn Store) -> Result<Vec<AccountRemovalRequest>, AppError> {
    let mut uow = store.begin().await?;
    let requests = uow.list_removal_requests().await?;
    uow.commit().await?;
    Ok(requests)
}
