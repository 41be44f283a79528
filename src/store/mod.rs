//! Persistence layer.
//!
//! Services never talk to the connection pool directly. They open a
//! [`UnitOfWork`] through a [`Store`], issue reads and writes on it, and call
//! [`UnitOfWork::commit`]. Dropping a unit without committing rolls every
//! write back, so an early `?` return can never leave a half-applied change.
//!
//! - [`postgres::PgStore`]: production implementation on sqlx/PostgreSQL
//! - `memory::MemoryStore`: in-process implementation used by tests

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        admin::{AccountRemovalRequest, SystemStats},
        analytics::{SummaryRow, TransactionFilter},
        transaction::{NewTransaction, Transaction},
        user::{NewUser, Role, User},
        wallet::Wallet,
    },
    security::token::TokenPurpose,
};

/// Factory for units of work plus a liveness probe.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new database transaction.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;

    /// Check that the backing database answers queries.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Single-use nonce backing an emailed verification or reset link.
#[derive(Debug, Clone)]
pub struct NewSecurityToken {
    pub nonce: Uuid,
    pub user_id: Uuid,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
}

/// One database transaction.
///
/// Every method runs inside the same transaction. Wallet mutations must call
/// [`UnitOfWork::lock_wallet`] before reading a balance they intend to change;
/// the lock is held until the unit is committed or dropped.
#[async_trait]
pub trait UnitOfWork: Send {
    // Users

    /// Insert a user. A duplicate email yields `AppError::Conflict`.
    async fn insert_user(&mut self, user: NewUser) -> Result<User, AppError>;

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError>;

    /// Users ordered by creation time, oldest first.
    async fn list_users(&mut self, offset: i64, limit: i64) -> Result<Vec<User>, AppError>;

    async fn set_user_verified(&mut self, id: Uuid) -> Result<User, AppError>;

    async fn set_user_password(&mut self, id: Uuid, password_hash: &str)
    -> Result<User, AppError>;

    async fn set_user_active(&mut self, id: Uuid, active: bool) -> Result<User, AppError>;

    async fn set_user_role(&mut self, id: Uuid, role: Role) -> Result<User, AppError>;

    async fn set_user_name(&mut self, id: Uuid, name: &str) -> Result<User, AppError>;

    // Wallets

    async fn insert_wallet(&mut self, user_id: Uuid, currency: &str) -> Result<Wallet, AppError>;

    async fn find_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, AppError>;

    async fn find_wallet_by_user(&mut self, user_id: Uuid) -> Result<Option<Wallet>, AppError>;

    /// Read a wallet and hold an exclusive row lock on it for the rest of the unit.
    async fn lock_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, AppError>;

    /// Add `delta_cents` (may be negative) to a wallet balance.
    ///
    /// The wallet must already be locked with [`UnitOfWork::lock_wallet`] in this unit.
    async fn adjust_wallet_balance(
        &mut self,
        id: Uuid,
        delta_cents: i64,
    ) -> Result<Wallet, AppError>;

    // Ledger

    async fn insert_transaction(&mut self, entry: NewTransaction)
    -> Result<Transaction, AppError>;

    /// Entries of one wallet matching `filter`, newest first.
    async fn list_transactions(
        &mut self,
        wallet_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError>;

    /// Sums and counts grouped by (day, category, direction), ordered by day.
    async fn summarize_transactions(
        &mut self,
        wallet_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<SummaryRow>, AppError>;

    // Security tokens

    async fn insert_security_token(&mut self, token: NewSecurityToken) -> Result<(), AppError>;

    /// Mark a nonce as used if it exists, matches `purpose`, is unexpired and
    /// has not been used before. Returns the owning user id on success.
    async fn consume_security_token(
        &mut self,
        nonce: Uuid,
        purpose: TokenPurpose,
    ) -> Result<Option<Uuid>, AppError>;

    // Account removal requests

    async fn insert_removal_request(
        &mut self,
        user_id: Uuid,
        details: Option<String>,
    ) -> Result<AccountRemovalRequest, AppError>;

    async fn list_removal_requests(&mut self) -> Result<Vec<AccountRemovalRequest>, AppError>;

    // Reporting

    async fn system_stats(&mut self) -> Result<SystemStats, AppError>;

    /// Make every write of this unit durable.
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
