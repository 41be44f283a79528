//! Wallet data models and wallet operation request/response types.
//!
//! This module defines:
//! - `Wallet`: Database entity holding a user's balance
//! - Request types for deposit, withdraw, purchase and transfer operations
//! - Response types carrying the updated balance and ledger entry ids

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Represents a wallet record from the database.
///
/// # Database Table
///
/// Maps to the `wallets` table. Each wallet:
/// - Belongs to exactly one user (via `user_id`)
/// - Has a balance stored in cents (to avoid floating-point errors)
///
/// # Balance Storage
///
/// Balances are `i64` cents and must stay >= 0 (enforced by database CHECK
/// constraint as well as by the wallet service).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Wallet {
    pub id: Uuid,

    pub user_id: Uuid,

    pub balance_cents: i64,

    /// Currency code (ISO 4217, 3 letters)
    pub currency: String,

    pub created_at: DateTime<Utc>,

    /// Timestamp of the last balance change
    pub updated_at: DateTime<Utc>,
}

/// Response body for wallet lookups.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub id: Uuid,
    pub balance_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            balance_cents: wallet.balance_cents,
            currency: wallet.currency,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

/// Response body for `GET /api/v1/wallet/balance`.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub wallet_id: Uuid,
    pub balance_cents: i64,
    pub currency: String,
}

impl From<Wallet> for BalanceResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            wallet_id: wallet.id,
            balance_cents: wallet.balance_cents,
            currency: wallet.currency,
        }
    }
}

/// Request to deposit money into a wallet.
///
/// # JSON Example
///
/// ```json
/// {
///   "wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount_cents": 200000,
///   "details": "Salary"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub wallet_id: Uuid,
    pub amount_cents: i64,
    pub details: Option<String>,
}

impl DepositRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_amount(self.amount_cents)?;
        validate_details(self.details.as_deref())
    }
}

/// Request to withdraw money from a wallet.
///
/// # Validation
///
/// - Amount must be positive
/// - Wallet must hold at least `amount_cents`
/// - Category, when given, must be 3 to 100 characters
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub wallet_id: Uuid,
    pub amount_cents: i64,
    pub category: Option<String>,
    pub details: Option<String>,
}

impl WithdrawRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_amount(self.amount_cents)?;
        if let Some(ref category) = self.category {
            validate_category(category)?;
        }
        validate_details(self.details.as_deref())
    }
}

/// Request to pay for goods or services out of a wallet.
///
/// # JSON Example
///
/// ```json
/// {
///   "wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount_cents": 4000000,
///   "category": "Rent"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub wallet_id: Uuid,
    pub amount_cents: i64,
    pub category: String,
    pub details: Option<String>,
}

impl PurchaseRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_amount(self.amount_cents)?;
        validate_category(&self.category)?;
        validate_details(self.details.as_deref())
    }
}

/// Request to transfer money between wallets.
///
/// # JSON Example
///
/// ```json
/// {
///   "from_wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "to_wallet_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount_cents": 200000,
///   "category": "Family"
/// }
/// ```
///
/// # Atomicity Guarantee
///
/// BOTH wallets and BOTH ledger entries are written in the same database
/// transaction. If any step fails, nothing is committed.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub amount_cents: i64,
    pub category: Option<String>,
    pub details: Option<String>,
}

impl TransferRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_amount(self.amount_cents)?;
        if self.from_wallet_id == self.to_wallet_id {
            return Err(AppError::validation("Cannot transfer to the same wallet"));
        }
        if let Some(ref category) = self.category {
            validate_category(category)?;
        }
        validate_details(self.details.as_deref())
    }
}

/// Response returned by deposit, withdraw and purchase.
///
/// # JSON Example
///
/// ```json
/// {
///   "transaction_id": "770e8400-e29b-41d4-a716-446655440002",
///   "wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount_cents": 200000,
///   "balance_cents": 43200000,
///   "currency": "KES"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct WalletOperationResponse {
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub amount_cents: i64,
    pub balance_cents: i64,
    pub currency: String,
}

/// Response returned by transfer. `balance_cents` is the source wallet's new balance.
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub debit_transaction_id: Uuid,
    pub credit_transaction_id: Uuid,
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub amount_cents: i64,
    pub balance_cents: i64,
    pub currency: String,
}

const MAX_DETAILS_LEN: usize = 255;

/// Largest amount a single operation may move (10 billion in major units).
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

pub fn validate_amount(amount_cents: i64) -> Result<(), AppError> {
    if amount_cents <= 0 {
        return Err(AppError::validation("Amount must be positive"));
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(AppError::validation(format!(
            "Amount must be at most {MAX_AMOUNT_CENTS} cents"
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<(), AppError> {
    let len = category.trim().chars().count();
    if !(3..=100).contains(&len) {
        return Err(AppError::validation(
            "Category must be between 3 and 100 characters",
        ));
    }
    Ok(())
}

fn validate_details(details: Option<&str>) -> Result<(), AppError> {
    match details {
        Some(details) if details.chars().count() > MAX_DETAILS_LEN => Err(AppError::validation(
            format!("Details must be at most {MAX_DETAILS_LEN} characters"),
        )),
        _ => Ok(()),
    }
}
