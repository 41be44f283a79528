//! Wallet HTTP handlers.
//!
//! This module implements wallet-related API endpoints:
//! - GET /api/v1/wallet - The caller's wallet
//! - GET /api/v1/wallet/balance - The caller's balance
//! - POST /api/v1/wallet/deposit - Add money to a wallet
//! - POST /api/v1/wallet/withdraw - Take money out of a wallet
//! - POST /api/v1/wallet/purchase - Pay for something out of a wallet
//! - POST /api/v1/wallet/transfer - Move money to another user's wallet
//!
//! Every mutation requires the caller to be active and verified and to own
//! the wallet named in the request (the source wallet, for transfers).

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::wallet::{
        BalanceResponse, DepositRequest, PurchaseRequest, TransferRequest, TransferResponse,
        WalletOperationResponse, WalletResponse, WithdrawRequest,
    },
    services::wallet_service::{self, WalletReceipt},
    state::AppState,
};

pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = wallet_service::wallet_for_user(state.store.as_ref(), auth.user.id).await?;
    Ok(Json(wallet.into()))
}

/// Current balance of the caller's wallet.
///
/// # Response (200)
///
/// ```json
/// {
///   "wallet_id": "550e8400-...",
///   "balance_cents": 43200000,
///   "currency": "KES"
/// }
/// ```
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<BalanceResponse>, AppError> {
    let wallet = wallet_service::wallet_for_user(state.store.as_ref(), auth.user.id).await?;
    Ok(Json(wallet.into()))
}

/// Deposit into the caller's wallet.
///
/// # Request Body
///
/// ```json
/// {
///   "wallet_id": "550e8400-...",
///   "amount_cents": 200000,
///   "details": "Salary"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "transaction_id": "770e8400-...",
///   "wallet_id": "550e8400-...",
///   "amount_cents": 200000,
///   "balance_cents": 43200000,
///   "currency": "KES"
/// }
/// ```
pub async fn deposit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<DepositRequest>,
) -> Result<Json<WalletOperationResponse>, AppError> {
    request.validate()?;
    auth.user.ensure_can_transact()?;

    // Verify wallet belongs to the caller
    wallet_service::owned_wallet(state.store.as_ref(), request.wallet_id, auth.user.id).await?;

    let receipt = wallet_service::execute_deposit(
        state.store.as_ref(),
        request.wallet_id,
        request.amount_cents,
        request.details,
    )
    .await?;

    Ok(Json(operation_response(receipt)))
}

/// Withdraw from the caller's wallet.
///
/// # Errors
///
/// - 400: Non-positive amount or malformed category
/// - 403: Caller is inactive or unverified
/// - 404: Wallet does not exist or belongs to someone else
/// - 422: Balance lower than the amount
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<WithdrawRequest>,
) -> Result<Json<WalletOperationResponse>, AppError> {
    request.validate()?;
    auth.user.ensure_can_transact()?;

    wallet_service::owned_wallet(state.store.as_ref(), request.wallet_id, auth.user.id).await?;

    let receipt = wallet_service::execute_withdrawal(
        state.store.as_ref(),
        request.wallet_id,
        request.amount_cents,
        request.category.map(|c| c.trim().to_string()),
        request.details,
    )
    .await?;

    Ok(Json(operation_response(receipt)))
}

/// Pay for goods or services.
///
/// # Request Body
///
/// ```json
/// {
///   "wallet_id": "550e8400-...",
///   "amount_cents": 4000000,
///   "category": "Rent",
///   "details": "December rent"
/// }
/// ```
pub async fn purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<PurchaseRequest>,
) -> Result<Json<WalletOperationResponse>, AppError> {
    request.validate()?;
    auth.user.ensure_can_transact()?;

    wallet_service::owned_wallet(state.store.as_ref(), request.wallet_id, auth.user.id).await?;

    let receipt = wallet_service::execute_purchase(
        state.store.as_ref(),
        request.wallet_id,
        request.amount_cents,
        request.category.trim().to_string(),
        request.details,
    )
    .await?;

    Ok(Json(operation_response(receipt)))
}

/// Transfer money to another wallet.
///
/// # Atomicity
///
/// Both wallets are updated in a single database transaction.
/// Either both succeed or both fail.
///
/// # Validation
///
/// - Source wallet must belong to the caller
/// - Recipient must be active and verified
/// - Both wallets must use the same currency
/// - Source must have sufficient balance
pub async fn transfer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<TransferRequest>,
) -> Result<Json<TransferResponse>, AppError> {
    request.validate()?;
    auth.user.ensure_can_transact()?;

    wallet_service::owned_wallet(state.store.as_ref(), request.from_wallet_id, auth.user.id)
        .await?;

    let receipt = wallet_service::execute_transfer(
        state.store.as_ref(),
        request.from_wallet_id,
        request.to_wallet_id,
        request.amount_cents,
        request.category.map(|c| c.trim().to_string()),
        request.details,
    )
    .await?;

    Ok(Json(TransferResponse {
        debit_transaction_id: receipt.debit.id,
        credit_transaction_id: receipt.credit.id,
        from_wallet_id: receipt.source.id,
        to_wallet_id: receipt.destination.id,
        amount_cents: receipt.debit.amount_cents,
        balance_cents: receipt.source.balance_cents,
        currency: receipt.source.currency,
    }))
}

fn operation_response(receipt: WalletReceipt) -> WalletOperationResponse {
    WalletOperationResponse {
        transaction_id: receipt.transaction.id,
        wallet_id: receipt.wallet.id,
        amount_cents: receipt.transaction.amount_cents,
        balance_cents: receipt.wallet.balance_cents,
        currency: receipt.wallet.currency,
    }
}
