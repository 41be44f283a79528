//! Transaction (ledger entry) data models.
//!
//! This module defines:
//! - `Transaction`: Database entity representing one balance change on one wallet
//! - `TransactionKind` / `Direction`: Classification used by analytics
//! - `TransactionResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// What caused a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Purchase,
    TransferOut,
    TransferIn,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Purchase => "purchase",
            TransactionKind::TransferOut => "transfer_out",
            TransactionKind::TransferIn => "transfer_in",
        }
    }

    /// Every kind moves money in exactly one direction.
    pub fn direction(self) -> Direction {
        match self {
            TransactionKind::Deposit | TransactionKind::TransferIn => Direction::Credit,
            TransactionKind::Withdrawal
            | TransactionKind::Purchase
            | TransactionKind::TransferOut => Direction::Debit,
        }
    }
}

impl TryFrom<String> for TransactionKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "purchase" => Ok(TransactionKind::Purchase),
            "transfer_out" => Ok(TransactionKind::TransferOut),
            "transfer_in" => Ok(TransactionKind::TransferIn),
            _ => Err(UnknownVariant {
                kind: "transaction kind",
                value,
            }),
        }
    }
}

/// Whether an entry adds to (`Credit`) or removes from (`Debit`) the wallet balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        }
    }
}

impl TryFrom<String> for Direction {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            _ => Err(UnknownVariant {
                kind: "direction",
                value,
            }),
        }
    }
}

/// Represents a ledger entry from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each entry:
/// - Belongs to exactly one wallet
/// - Stores a positive amount in cents; the sign comes from `direction`
/// - Is written once and never updated
///
/// A transfer produces two entries, one per wallet, each pointing at the
/// other wallet through `counterparty_wallet_id`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,

    pub wallet_id: Uuid,

    #[sqlx(try_from = "String")]
    pub kind: TransactionKind,

    #[sqlx(try_from = "String")]
    pub direction: Direction,

    /// Amount in cents, always positive (enforced by CHECK constraint)
    pub amount_cents: i64,

    /// Spending category used by analytics (e.g., "Rent")
    pub category: Option<String>,

    /// Free-text note supplied by the caller
    pub details: Option<String>,

    /// The other wallet of a transfer
    pub counterparty_wallet_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with the sign of its effect on the wallet balance.
    pub fn signed_amount(&self) -> i64 {
        match self.direction {
            Direction::Credit => self.amount_cents,
            Direction::Debit => -self.amount_cents,
        }
    }
}

/// Values needed to append a ledger entry.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub category: Option<String>,
    pub details: Option<String>,
    pub counterparty_wallet_id: Option<Uuid>,
}

/// Response body describing a ledger entry.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "8b22952d-ce0b-417d-b28b-80162a5e2c4a",
///   "wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "kind": "purchase",
///   "direction": "debit",
///   "amount_cents": 300000,
///   "category": "Rent",
///   "details": null,
///   "counterparty_wallet_id": null,
///   "created_at": "2025-12-30T09:22:42Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub direction: Direction,
    pub amount_cents: i64,
    pub category: Option<String>,
    pub details: Option<String>,
    pub counterparty_wallet_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            wallet_id: transaction.wallet_id,
            kind: transaction.kind,
            direction: transaction.direction,
            amount_cents: transaction.amount_cents,
            category: transaction.category,
            details: transaction.details,
            counterparty_wallet_id: transaction.counterparty_wallet_id,
            created_at: transaction.created_at,
        }
    }
}
