//! PostgreSQL implementation of the store.
//!
//! # Atomicity Guarantees
//!
//! A [`PgUnit`] wraps one `sqlx::Transaction`. The transaction runs at
//! PostgreSQL's default READ COMMITTED level; wallets are locked explicitly
//! with `SELECT ... FOR UPDATE`, which blocks concurrent mutations of the same
//! row until commit or rollback. Dropping the unit rolls back.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use super::{NewSecurityToken, Store, UnitOfWork};
use crate::{
    db::DbPool,
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

const USER_COLUMNS: &str = "id, name, email, password_hash, verified, active, role, created_at";

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One open PostgreSQL transaction.
pub struct PgUnit {
    tx: PgTransaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn insert_user(&mut self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, verified, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.verified)
            .bind(user.role.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict("Email is already registered".to_string())
                }
                other => AppError::Database(other),
            })
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn list_users(&mut self, offset: i64, limit: i64) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id OFFSET $1 LIMIT $2"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(users)
    }

    async fn set_user_verified(&mut self, id: Uuid) -> Result<User, AppError> {
        let sql = format!("UPDATE users SET verified = TRUE WHERE id = $1 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    async fn set_user_password(
        &mut self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let sql =
            format!("UPDATE users SET password_hash = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(password_hash)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    async fn set_user_active(&mut self, id: Uuid, active: bool) -> Result<User, AppError> {
        let sql = format!("UPDATE users SET active = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(active)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    async fn set_user_role(&mut self, id: Uuid, role: Role) -> Result<User, AppError> {
        let sql = format!("UPDATE users SET role = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    async fn set_user_name(&mut self, id: Uuid, name: &str) -> Result<User, AppError> {
        let sql = format!("UPDATE users SET name = $1 WHERE id = $2 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(name)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    async fn insert_wallet(&mut self, user_id: Uuid, currency: &str) -> Result<Wallet, AppError> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            INSERT INTO wallets (user_id, currency, balance_cents)
            VALUES ($1, $2, 0)
            RETURNING id, user_id, balance_cents, currency, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(currency)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(wallet)
    }

    async fn find_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, AppError> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, balance_cents, currency, created_at, updated_at
            FROM wallets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(wallet)
    }

    async fn find_wallet_by_user(&mut self, user_id: Uuid) -> Result<Option<Wallet>, AppError> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, balance_cents, currency, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(wallet)
    }

    async fn lock_wallet(&mut self, id: Uuid) -> Result<Option<Wallet>, AppError> {
        // FOR UPDATE ensures no other transaction can modify this row until we finish
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, user_id, balance_cents, currency, created_at, updated_at
            FROM wallets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(wallet)
    }

    async fn adjust_wallet_balance(
        &mut self,
        id: Uuid,
        delta_cents: i64,
    ) -> Result<Wallet, AppError> {
        sqlx::query_as::<_, Wallet>(
            r#"
            UPDATE wallets
            SET balance_cents = balance_cents + $1,
                updated_at = NOW()
            WHERE id = $2
            RETURNING id, user_id, balance_cents, currency, created_at, updated_at
            "#,
        )
        .bind(delta_cents)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(AppError::NotFound("Wallet"))
    }

    async fn insert_transaction(
        &mut self,
        entry: NewTransaction,
    ) -> Result<Transaction, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                wallet_id,
                kind,
                direction,
                amount_cents,
                category,
                details,
                counterparty_wallet_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(entry.wallet_id)
        .bind(entry.kind.as_str())
        .bind(entry.kind.direction().as_str())
        .bind(entry.amount_cents)
        .bind(entry.category)
        .bind(entry.details)
        .bind(entry.counterparty_wallet_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(transaction)
    }

    async fn list_transactions(
        &mut self,
        wallet_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT *
            FROM transactions
            WHERE wallet_id = $1
              AND (created_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
              AND ($4::text IS NULL OR category = $4)
              AND ($5::text IS NULL OR kind = $5)
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(wallet_id)
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.category.as_deref())
        .bind(filter.kind.map(|k| k.as_str()))
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(transactions)
    }

    async fn summarize_transactions(
        &mut self,
        wallet_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<SummaryRow>, AppError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT
                (created_at AT TIME ZONE 'UTC')::date AS day,
                category,
                direction,
                SUM(amount_cents)::BIGINT AS total_cents,
                COUNT(*) AS count
            FROM transactions
            WHERE wallet_id = $1
              AND (created_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
              AND ($4::text IS NULL OR category = $4)
              AND ($5::text IS NULL OR kind = $5)
            GROUP BY 1, 2, 3
            ORDER BY 1, 2, 3
            "#,
        )
        .bind(wallet_id)
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.category.as_deref())
        .bind(filter.kind.map(|k| k.as_str()))
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn insert_security_token(&mut self, token: NewSecurityToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO security_tokens (nonce, user_id, purpose, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(token.nonce)
        .bind(token.user_id)
        .bind(token.purpose.as_str())
        .bind(token.expires_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn consume_security_token(
        &mut self,
        nonce: Uuid,
        purpose: TokenPurpose,
    ) -> Result<Option<Uuid>, AppError> {
        // A single conditional UPDATE: two concurrent submissions of the same
        // token cannot both see consumed_at IS NULL.
        let user_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE security_tokens
            SET consumed_at = NOW()
            WHERE nonce = $1
              AND purpose = $2
              AND consumed_at IS NULL
              AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(nonce)
        .bind(purpose.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user_id)
    }

    async fn insert_removal_request(
        &mut self,
        user_id: Uuid,
        details: Option<String>,
    ) -> Result<AccountRemovalRequest, AppError> {
        let request = sqlx::query_as::<_, AccountRemovalRequest>(
            r#"
            INSERT INTO account_removal_requests (user_id, details)
            VALUES ($1, $2)
            RETURNING id, user_id, details, status, requested_at
            "#,
        )
        .bind(user_id)
        .bind(details)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(request)
    }

    async fn list_removal_requests(&mut self) -> Result<Vec<AccountRemovalRequest>, AppError> {
        let requests = sqlx::query_as::<_, AccountRemovalRequest>(
            r#"
            SELECT id, user_id, details, status, requested_at
            FROM account_removal_requests
            ORDER BY requested_at DESC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(requests)
    }

    async fn system_stats(&mut self) -> Result<SystemStats, AppError> {
        let stats = sqlx::query_as::<_, SystemStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE verified) AS verified_users,
                (SELECT COUNT(*) FROM users WHERE active) AS active_users,
                (SELECT COUNT(*) FROM wallets) AS total_wallets,
                (SELECT COUNT(*) FROM transactions) AS total_transactions,
                (SELECT COALESCE(SUM(balance_cents), 0)::BIGINT FROM wallets) AS total_balance_cents
            "#,
        )
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(stats)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
