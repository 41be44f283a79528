//! Analytics HTTP handlers.
//!
//! - GET /api/v1/analytics/summary - Totals by category and by day
//! - GET /api/v1/analytics/statement - Matching ledger entries, newest first
//!
//! Both read the caller's own wallet and accept `start_date`, `end_date`
//! (inclusive, `YYYY-MM-DD`), `category` and `kind` query parameters.

use axum::{
    Extension, Json,
    extract::State,
};

use crate::{
    error::AppError,
    extract::AppQuery,
    middleware::auth::AuthContext,
    models::analytics::{AnalyticsQuery, SpendingSummary, StatementResponse},
    services::{analytics_service, wallet_service},
    state::AppState,
};

pub async fn summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<AnalyticsQuery>,
) -> Result<Json<SpendingSummary>, AppError> {
    let filter = query.into_filter()?;
    let wallet = wallet_service::wallet_for_user(state.store.as_ref(), auth.user.id).await?;

    let summary = analytics_service::summarize(state.store.as_ref(), wallet.id, &filter).await?;
    Ok(Json(summary))
}

pub async fn statement(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<AnalyticsQuery>,
) -> Result<Json<StatementResponse>, AppError> {
    let filter = query.into_filter()?;
    let wallet = wallet_service::wallet_for_user(state.store.as_ref(), auth.user.id).await?;

    let transactions =
        analytics_service::statement(state.store.as_ref(), wallet.id, &filter).await?;

    Ok(Json(StatementResponse {
        wallet_id: wallet.id,
        start_date: filter.start,
        end_date: filter.end,
        transactions: transactions.into_iter().map(Into::into).collect(),
    }))
}
