//! Wallet service - Core business logic for balance-changing operations.
//!
//! This service handles:
//! - Deposits, withdrawals and purchases on a single wallet
//! - Transfers between two wallets
//! - Balance validation
//! - Ledger entries for every balance change
//!
//! # Atomicity Guarantees
//!
//! Each operation runs in one unit of work. The wallet row is locked before
//! its balance is read, the balance and the ledger entry are written
//! together, and nothing becomes visible until commit. Any error drops the
//! unit, which rolls every write back.
//!
//! # Reconciliation
//!
//! After every committed operation, a wallet's balance equals the signed sum
//! of its ledger entries (credits minus debits).

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        transaction::{NewTransaction, Transaction, TransactionKind},
        wallet::{Wallet, validate_amount},
    },
    store::Store,
};

/// Result of a single-wallet operation.
#[derive(Debug, Clone)]
pub struct WalletReceipt {
    /// Wallet state after the operation
    pub wallet: Wallet,
    pub transaction: Transaction,
}

/// Result of a transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub source: Wallet,
    pub destination: Wallet,
    pub debit: Transaction,
    pub credit: Transaction,
}

/// Look up the wallet owned by `user_id`.
pub async fn wallet_for_user(store: &dyn Store, user_id: Uuid) -> Result<Wallet, AppError> {
    let mut uow = store.begin().await?;
    let wallet = uow
        .find_wallet_by_user(user_id)
        .await?
        .ok_or(AppError::NotFound("Wallet"))?;
    uow.commit().await?;
    Ok(wallet)
}

/// Look up a wallet and check that `user_id` owns it.
///
/// A wallet owned by someone else is reported as not found so callers cannot
/// probe for other users' wallet ids.
pub async fn owned_wallet(
    store: &dyn Store,
    wallet_id: Uuid,
    user_id: Uuid,
) -> Result<Wallet, AppError> {
    let mut uow = store.begin().await?;
    let wallet = uow
        .find_wallet(wallet_id)
        .await?
        .filter(|w| w.user_id == user_id)
        .ok_or(AppError::NotFound("Wallet"))?;
    uow.commit().await?;
    Ok(wallet)
}

/// Add money to a wallet.
///
/// # Process
///
/// 1. Lock the wallet row
/// 2. Increase the balance
/// 3. Record a `deposit` ledger entry
/// 4. Commit (or roll back on error)
///
/// # Errors
///
/// - `Validation`: Amount is out of range, or the balance would overflow
/// - `NotFound`: Wallet doesn't exist
/// - `Database`: Database error occurred
pub async fn execute_deposit(
    store: &dyn Store,
    wallet_id: Uuid,
    amount_cents: i64,
    details: Option<String>,
) -> Result<WalletReceipt, AppError> {
    validate_amount(amount_cents)?;

    let mut uow = store.begin().await?;

    let current = uow
        .lock_wallet(wallet_id)
        .await?
        .ok_or(AppError::NotFound("Wallet"))?;
    ensure_capacity(&current, amount_cents)?;

    let wallet = uow.adjust_wallet_balance(wallet_id, amount_cents).await?;

    let transaction = uow
        .insert_transaction(NewTransaction {
            wallet_id,
            kind: TransactionKind::Deposit,
            amount_cents,
            category: None,
            details,
            counterparty_wallet_id: None,
        })
        .await?;

    uow.commit().await?;

    tracing::info!(%wallet_id, amount_cents, "deposit completed");
    Ok(WalletReceipt {
        wallet,
        transaction,
    })
}

/// Take money out of a wallet.
///
/// # Errors
///
/// - `Validation`: Amount is zero or negative
/// - `NotFound`: Wallet doesn't exist
/// - `InsufficientFunds`: Balance is lower than `amount_cents` (nothing is written)
pub async fn execute_withdrawal(
    store: &dyn Store,
    wallet_id: Uuid,
    amount_cents: i64,
    category: Option<String>,
    details: Option<String>,
) -> Result<WalletReceipt, AppError> {
    debit(
        store,
        wallet_id,
        TransactionKind::Withdrawal,
        amount_cents,
        category,
        details,
    )
    .await
}

/// Pay for goods or services out of a wallet.
///
/// Behaves like a withdrawal but always carries a spending category, which
/// is what the analytics breakdown groups on.
pub async fn execute_purchase(
    store: &dyn Store,
    wallet_id: Uuid,
    amount_cents: i64,
    category: String,
    details: Option<String>,
) -> Result<WalletReceipt, AppError> {
    debit(
        store,
        wallet_id,
        TransactionKind::Purchase,
        amount_cents,
        Some(category),
        details,
    )
    .await
}

async fn debit(
    store: &dyn Store,
    wallet_id: Uuid,
    kind: TransactionKind,
    amount_cents: i64,
    category: Option<String>,
    details: Option<String>,
) -> Result<WalletReceipt, AppError> {
    validate_amount(amount_cents)?;

    let mut uow = store.begin().await?;

    // Lock the wallet and check balance
    let current = uow
        .lock_wallet(wallet_id)
        .await?
        .ok_or(AppError::NotFound("Wallet"))?;

    if current.balance_cents < amount_cents {
        tracing::info!(
            %wallet_id,
            amount_cents,
            balance_cents = current.balance_cents,
            "{} rejected: insufficient funds",
            kind.as_str()
        );
        return Err(AppError::InsufficientFunds);
    }

    let wallet = uow.adjust_wallet_balance(wallet_id, -amount_cents).await?;

    let transaction = uow
        .insert_transaction(NewTransaction {
            wallet_id,
            kind,
            amount_cents,
            category,
            details,
            counterparty_wallet_id: None,
        })
        .await?;

    uow.commit().await?;

    tracing::info!(%wallet_id, amount_cents, "{} completed", kind.as_str());
    Ok(WalletReceipt {
        wallet,
        transaction,
    })
}

/// Move money from one wallet to another.
///
/// # Process
///
/// 1. Lock both wallets, lowest id first
/// 2. Check the recipient can receive money and both currencies match
/// 3. Check the source balance
/// 4. Debit source, credit destination
/// 5. Record a `transfer_out` entry on the source and a `transfer_in` entry
///    on the destination, each pointing at the other wallet
/// 6. Commit
///
/// # Atomicity
///
/// All four writes share one unit of work. A failure at any step leaves both
/// balances and both ledgers untouched.
///
/// # Errors
///
/// - `Validation`: Amount out of range, same wallet on both sides, currency
///   mismatch, or the destination balance would overflow
/// - `NotFound`: Either wallet doesn't exist
/// - `Permission`: Recipient account is inactive or unverified
/// - `InsufficientFunds`: Source balance is lower than `amount_cents`
pub async fn execute_transfer(
    store: &dyn Store,
    from_wallet_id: Uuid,
    to_wallet_id: Uuid,
    amount_cents: i64,
    category: Option<String>,
    details: Option<String>,
) -> Result<TransferReceipt, AppError> {
    validate_amount(amount_cents)?;

    if from_wallet_id == to_wallet_id {
        return Err(AppError::validation("Cannot transfer to the same wallet"));
    }

    let mut uow = store.begin().await?;

    // Two transfers in opposite directions must take the locks in the same order
    let (first_id, second_id) = if from_wallet_id < to_wallet_id {
        (from_wallet_id, to_wallet_id)
    } else {
        (to_wallet_id, from_wallet_id)
    };
    let first = uow
        .lock_wallet(first_id)
        .await?
        .ok_or(AppError::NotFound("Wallet"))?;
    let second = uow
        .lock_wallet(second_id)
        .await?
        .ok_or(AppError::NotFound("Wallet"))?;
    let (source, destination) = if first_id == from_wallet_id {
        (first, second)
    } else {
        (second, first)
    };

    let recipient = uow
        .find_user_by_id(destination.user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    if !recipient.active {
        return Err(AppError::permission("Recipient account is not active"));
    }
    if !recipient.verified {
        return Err(AppError::permission("Recipient account is not verified"));
    }

    if source.currency != destination.currency {
        return Err(AppError::validation(format!(
            "Cannot transfer {} to a {} wallet",
            source.currency, destination.currency
        )));
    }

    if source.balance_cents < amount_cents {
        tracing::info!(
            %from_wallet_id,
            amount_cents,
            balance_cents = source.balance_cents,
            "transfer rejected: insufficient funds"
        );
        return Err(AppError::InsufficientFunds);
    }
    ensure_capacity(&destination, amount_cents)?;

    let source = uow
        .adjust_wallet_balance(from_wallet_id, -amount_cents)
        .await?;
    let destination = uow.adjust_wallet_balance(to_wallet_id, amount_cents).await?;

    let debit = uow
        .insert_transaction(NewTransaction {
            wallet_id: from_wallet_id,
            kind: TransactionKind::TransferOut,
            amount_cents,
            category: category.clone(),
            details: details.clone(),
            counterparty_wallet_id: Some(to_wallet_id),
        })
        .await?;
    let credit = uow
        .insert_transaction(NewTransaction {
            wallet_id: to_wallet_id,
            kind: TransactionKind::TransferIn,
            amount_cents,
            category,
            details,
            counterparty_wallet_id: Some(from_wallet_id),
        })
        .await?;

    uow.commit().await?;

    tracing::info!(%from_wallet_id, %to_wallet_id, amount_cents, "transfer completed");
    Ok(TransferReceipt {
        source,
        destination,
        debit,
        credit,
    })
}

/// Reject a credit that would push the balance past what the column can hold.
fn ensure_capacity(wallet: &Wallet, amount_cents: i64) -> Result<(), AppError> {
    if wallet.balance_cents.checked_add(amount_cents).is_none() {
        tracing::warn!(
            wallet_id = %wallet.id,
            amount_cents,
            "credit rejected: balance would overflow"
        );
        return Err(AppError::validation("Wallet balance limit exceeded"));
    }
    Ok(())
}
