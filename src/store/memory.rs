//! In-memory store used by tests.
//!
//! A unit of work takes an owned lock on the whole dataset, works on a
//! private copy, and writes the copy back on commit. Units therefore run one
//! at a time (strictly serializable) and a dropped unit leaves no trace,
//! which mirrors the rollback behaviour of the PostgreSQL store.
//!
//! Row locks are still tracked per unit: changing a balance on a wallet the
//! unit has not taken with `lock_wallet` is an error, so code that skips the
//! lock fails here instead of racing silently against PostgreSQL.
//!
//! [`MemoryStore::failing_on_write`] makes the n-th write of a unit return a
//! database error so tests can interrupt an operation midway.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{NewSecurityToken, Store, UnitOfWork};
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

#[derive(Debug, Clone)]
struct TokenRecord {
    user_id: Uuid,
    purpose: TokenPurpose,
    expires_at: DateTime<Utc>,
    consumed: bool,
}

#[derive(Debug, Clone, Default)]
struct Dataset {
    users: Vec<User>,
    wallets: HashMap<Uuid, Wallet>,
    transactions: Vec<Transaction>,
    tokens: HashMap<Uuid, TokenRecord>,
    removal_requests: Vec<AccountRemovalRequest>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Dataset>>,
    /// 1-based index of the write that fails inside each unit; 0 disables.
    fail_on_write: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th write (1-based) of every subsequent unit fail.
    pub fn failing_on_write(self, n: usize) -> Self {
        self.fail_on_write.store(n, Ordering::SeqCst);
        self
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        self.fail_on_write.store(0, Ordering::SeqCst);
    }

    /// Committed ledger entries of one wallet, oldest first.
    pub async fn transactions_of(&self, wallet_id: Uuid) -> Vec<Transaction> {
        self.data
            .lock()
            .await
            .transactions
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect()
    }

    /// Committed state of one wallet.
    pub async fn wallet(&self, wallet_id: Uuid) -> Option<Wallet> {
        self.data.lock().await.wallets.get(&wallet_id).cloned()
    }

    /// Rewrite a ledger entry's timestamp (for date-range tests).
    pub async fn backdate_transaction(&self, id: Uuid, created_at: DateTime<Utc>) {
        let mut data = self.data.lock().await;
        if let Some(t) = data.transactions.iter_mut().find(|t| t.id == id) {
            t.created_at = created_at;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let guard = self.data.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnit {
            guard,
            working,
            locked: HashSet::new(),
            writes: 0,
            fail_on_write: self.fail_on_write.load(Ordering::SeqCst),
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct MemoryUnit {
    guard: OwnedMutexGuard<Dataset>,
    working: Dataset,
    /// Wallet ids taken with `lock_wallet` in this unit
    locked: HashSet<Uuid>,
    writes: usize,
    fail_on_write: usize,
}

impl MemoryUnit {
    fn record_write(&mut self) -> Result<(), AppError> {
        self.writes += 1;
        if self.fail_on_write != 0 && self.writes == self.fail_on_write {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "injected write failure".to_string(),
            )));
        }
        Ok(())
    }

    fn user_mut(&mut self, id: Uuid) -> Result<&mut User, AppError> {
        self.working
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("User"))
    }

    fn matching<'a>(
        &'a self,
        wallet_id: Uuid,
        filter: &'a TransactionFilter,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.working.transactions.iter().filter(move |t| {
            let day = t.created_at.date_naive();
            t.wallet_id == wallet_id
                && day >= filter.start
                && day <= filter.end
                && filter
                    .category
                    .as_ref()
                    .is_none_or(|c| t.category.as_ref() == Some(c))
                && filter.kind.is_none_or(|k| t.kind == k)
        })
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn insert_user(&mut self, user: NewUser) -> Result<User, AppError> {
        self.record_write()?;
        if self.working.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            verified: user.verified,
            active: true,
            role: user.role,
            created_at: Utc::now(),
        };
        self.working.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.working.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.working.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&mut self, offset: i64, limit: i64) -> Result<Vec<User>, AppError> {
        Ok(self
            .working
            .users
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn set_user_verified(&mut self, id: Uuid) -> Result<User, AppError> {
        self.record_write()?;
        let user = self.user_mut(id)?;
        user.verified = true;
        Ok(user.clone())
    }

    async fn set_user_password(
        &mut self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<User, AppError> {
        self.record_write()?;
        let user = self.user_mut(id)?;
        user.password_hash = password_hash.to_string();
        Ok(user.clone())
    }

    async fn set_user_active(&mut self, id: Uuid, active: bool) -> Result<User, AppError> {
        self.record_write()?;
        let user = self.user_mut(id)?;
        user.active = active;
        Ok(user.clone())
    }

    async fn set_user_role(&mut self, id: Uuid, role: Role) -> Result<User, AppError> {
        self.record_write()?;
        let user = self.user_mut(id)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn set_user_name(&mut self, id: Uuid, name: &str) -> Result<User, AppError> {
        self.record_write()?;
        let user = self.user_mut(id)?;
        user.name = name.to_string();
        Ok(user.clone())
    }

    async fn insert_wallet(&mut self, user_id: Uuid, currency: &str) -> Result<Wallet, AppError> {
        self.record_write()?;
        let now = Utc::now();
        let wallet = Wallet {
            id: Uuid::new_v4(),
            user_id,
            balance_cents: 0,
            currency: currency.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.working.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn find_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, AppError> {
        Ok(self.working.wallets.get(&id).cloned())
    }

    async fn find_wallet_by_user(&mut self, user_id: Uuid) -> Result<Option<Wallet>, AppError> {
        Ok(self
            .working
            .wallets
            .values()
            .find(|w| w.user_id == user_id)
            .cloned())
    }

    async fn lock_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, AppError> {
        let wallet = self.working.wallets.get(&id).cloned();
        if wallet.is_some() {
            self.locked.insert(id);
        }
        Ok(wallet)
    }

    async fn adjust_wallet_balance(
        &mut self,
        id: Uuid,
        delta_cents: i64,
    ) -> Result<Wallet, AppError> {
        if !self.locked.contains(&id) {
            return Err(AppError::Internal(format!(
                "balance of wallet {id} changed without holding its row lock"
            )));
        }
        self.record_write()?;
        let wallet = self
            .working
            .wallets
            .get_mut(&id)
            .ok_or(AppError::NotFound("Wallet"))?;
        let balance = wallet.balance_cents.checked_add(delta_cents).ok_or_else(|| {
            AppError::Database(sqlx::Error::Protocol("bigint out of range".to_string()))
        })?;
        if balance < 0 {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "balance_cents check constraint violated".to_string(),
            )));
        }
        wallet.balance_cents = balance;
        wallet.updated_at = Utc::now();
        Ok(wallet.clone())
    }

    async fn insert_transaction(
        &mut self,
        entry: NewTransaction,
    ) -> Result<Transaction, AppError> {
        self.record_write()?;
        if !self.working.wallets.contains_key(&entry.wallet_id) {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "transactions.wallet_id foreign key violated".to_string(),
            )));
        }
        let transaction = Transaction {
            id: Uuid::new_v4(),
            wallet_id: entry.wallet_id,
            kind: entry.kind,
            direction: entry.kind.direction(),
            amount_cents: entry.amount_cents,
            category: entry.category,
            details: entry.details,
            counterparty_wallet_id: entry.counterparty_wallet_id,
            created_at: Utc::now(),
        };
        self.working.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn list_transactions(
        &mut self,
        wallet_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        let mut found: Vec<Transaction> = self.matching(wallet_id, filter).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn summarize_transactions(
        &mut self,
        wallet_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<SummaryRow>, AppError> {
        let mut rows: Vec<SummaryRow> = Vec::new();
        for t in self.matching(wallet_id, filter) {
            let day = t.created_at.date_naive();
            match rows
                .iter_mut()
                .find(|r| r.day == day && r.category == t.category && r.direction == t.direction)
            {
                Some(row) => {
                    row.total_cents += t.amount_cents;
                    row.count += 1;
                }
                None => rows.push(SummaryRow {
                    day,
                    category: t.category.clone(),
                    direction: t.direction,
                    total_cents: t.amount_cents,
                    count: 1,
                }),
            }
        }
        rows.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.category.cmp(&b.category)));
        Ok(rows)
    }

    async fn insert_security_token(&mut self, token: NewSecurityToken) -> Result<(), AppError> {
        self.record_write()?;
        self.working.tokens.insert(
            token.nonce,
            TokenRecord {
                user_id: token.user_id,
                purpose: token.purpose,
                expires_at: token.expires_at,
                consumed: false,
            },
        );
        Ok(())
    }

    async fn consume_security_token(
        &mut self,
        nonce: Uuid,
        purpose: TokenPurpose,
    ) -> Result<Option<Uuid>, AppError> {
        self.record_write()?;
        let now = Utc::now();
        match self.working.tokens.get_mut(&nonce) {
            Some(record)
                if record.purpose == purpose && !record.consumed && record.expires_at > now =>
            {
                record.consumed = true;
                Ok(Some(record.user_id))
            }
            _ => Ok(None),
        }
    }

    async fn insert_removal_request(
        &mut self,
        user_id: Uuid,
        details: Option<String>,
    ) -> Result<AccountRemovalRequest, AppError> {
        self.record_write()?;
        let request = AccountRemovalRequest {
            id: Uuid::new_v4(),
            user_id,
            details,
            status: "pending".to_string(),
            requested_at: Utc::now(),
        };
        self.working.removal_requests.push(request.clone());
        Ok(request)
    }

    async fn list_removal_requests(&mut self) -> Result<Vec<AccountRemovalRequest>, AppError> {
        let mut requests = self.working.removal_requests.clone();
        requests.reverse();
        Ok(requests)
    }

    async fn system_stats(&mut self) -> Result<SystemStats, AppError> {
        let users = &self.working.users;
        Ok(SystemStats {
            total_users: users.len() as i64,
            verified_users: users.iter().filter(|u| u.verified).count() as i64,
            active_users: users.iter().filter(|u| u.active).count() as i64,
            total_wallets: self.working.wallets.len() as i64,
            total_transactions: self.working.transactions.len() as i64,
            total_balance_cents: self.working.wallets.values().map(|w| w.balance_cents).sum(),
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryUnit {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_wallet(store: &MemoryStore) -> Wallet {
        let mut uow = store.begin().await.unwrap();
        let user = uow
            .insert_user(NewUser {
                name: "Lock Owner".to_string(),
                email: "owner@example.com".to_string(),
                password_hash: "x".to_string(),
                verified: true,
                role: Role::User,
            })
            .await
            .unwrap();
        let wallet = uow.insert_wallet(user.id, "KES").await.unwrap();
        uow.commit().await.unwrap();
        wallet
    }

    #[tokio::test]
    async fn balance_change_without_row_lock_is_refused() {
        let store = MemoryStore::new();
        let wallet = seeded_wallet(&store).await;

        let mut uow = store.begin().await.unwrap();
        uow.find_wallet(wallet.id).await.unwrap().unwrap();
        let result = uow.adjust_wallet_balance(wallet.id, 100).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn balance_change_after_lock_is_applied_on_commit() {
        let store = MemoryStore::new();
        let wallet = seeded_wallet(&store).await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_wallet(wallet.id).await.unwrap().unwrap();
        uow.adjust_wallet_balance(wallet.id, 100).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.wallet(wallet.id).await.unwrap().balance_cents, 100);
    }

    #[tokio::test]
    async fn row_lock_does_not_outlive_its_unit() {
        let store = MemoryStore::new();
        let wallet = seeded_wallet(&store).await;

        let mut first = store.begin().await.unwrap();
        first.lock_wallet(wallet.id).await.unwrap();
        first.commit().await.unwrap();

        let mut second = store.begin().await.unwrap();
        assert!(second.adjust_wallet_balance(wallet.id, 100).await.is_err());
    }

    #[tokio::test]
    async fn balance_overflow_is_a_database_error() {
        let store = MemoryStore::new();
        let wallet = seeded_wallet(&store).await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_wallet(wallet.id).await.unwrap();
        uow.adjust_wallet_balance(wallet.id, i64::MAX).await.unwrap();
        let result = uow.adjust_wallet_balance(wallet.id, 1).await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
