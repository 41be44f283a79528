//! Self-service account operations for the authenticated caller.

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{admin::AccountRemovalRequest, user::User},
    services::email_service::{self, account_removal_email},
    state::AppState,
    store::Store,
};

/// Load a user by id.
pub async fn find_user(store: &dyn Store, user_id: Uuid) -> Result<Option<User>, AppError> {
    let mut uow = store.begin().await?;
    let user = uow.find_user_by_id(user_id).await?;
    uow.commit().await?;
    Ok(user)
}

/// Change the caller's display name.
pub async fn update_profile(
    store: &dyn Store,
    user_id: Uuid,
    name: &str,
) -> Result<User, AppError> {
    let mut uow = store.begin().await?;
    let user = uow.set_user_name(user_id, name.trim()).await?;
    uow.commit().await?;

    tracing::info!(%user_id, "profile updated");
    Ok(user)
}

/// Record a request to remove the caller's account and acknowledge it by email.
///
/// The account stays usable; removal is carried out by an operator.
pub async fn request_account_removal(
    state: &AppState,
    user: &User,
    details: Option<String>,
) -> Result<AccountRemovalRequest, AppError> {
    let details = details
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let mut uow = state.store.begin().await?;
    let request = uow.insert_removal_request(user.id, details).await?;
    uow.commit().await?;

    tracing::info!(user_id = %user.id, request_id = %request.id, "account removal requested");

    email_service::deliver(
        state.mailer.as_ref(),
        account_removal_email(&user.email, &user.name, &state.config.support_email),
    )
    .await;

    Ok(request)
}
