//! Spending analytics over a wallet's ledger.
//!
//! The store does the heavy lifting (one GROUP BY over day, category and
//! direction); this module folds those rows into the per-category and
//! per-day breakdowns returned to clients.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        analytics::{
            CategoryTotal, DayTotal, SpendingSummary, SummaryRow, TransactionFilter, UNCATEGORIZED,
        },
        transaction::{Direction, Transaction},
    },
    store::Store,
};

/// Totals for one wallet over the filter's date range.
///
/// An empty range is not an error: every total is zero and both breakdowns
/// are empty.
///
/// # Errors
///
/// - `NotFound`: Wallet doesn't exist
pub async fn summarize(
    store: &dyn Store,
    wallet_id: Uuid,
    filter: &TransactionFilter,
) -> Result<SpendingSummary, AppError> {
    let mut uow = store.begin().await?;
    uow.find_wallet(wallet_id)
        .await?
        .ok_or(AppError::NotFound("Wallet"))?;
    let rows = uow.summarize_transactions(wallet_id, filter).await?;
    uow.commit().await?;

    Ok(fold_summary(wallet_id, filter, rows))
}

/// Ledger entries for one wallet matching the filter, newest first.
pub async fn statement(
    store: &dyn Store,
    wallet_id: Uuid,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, AppError> {
    let mut uow = store.begin().await?;
    uow.find_wallet(wallet_id)
        .await?
        .ok_or(AppError::NotFound("Wallet"))?;
    let transactions = uow.list_transactions(wallet_id, filter).await?;
    uow.commit().await?;

    Ok(transactions)
}

/// Fold grouped rows into a summary. Categories and days come out sorted.
pub fn fold_summary(
    wallet_id: Uuid,
    filter: &TransactionFilter,
    rows: Vec<SummaryRow>,
) -> SpendingSummary {
    let mut by_category: BTreeMap<String, CategoryTotal> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, DayTotal> = BTreeMap::new();
    let mut total_credit_cents = 0;
    let mut total_debit_cents = 0;
    let mut transaction_count = 0;

    for row in rows {
        let category = row.category.unwrap_or_else(|| UNCATEGORIZED.to_string());
        let category_total = by_category
            .entry(category.clone())
            .or_insert_with(|| CategoryTotal {
                category,
                credit_cents: 0,
                debit_cents: 0,
                count: 0,
            });
        let day_total = by_day.entry(row.day).or_insert_with(|| DayTotal {
            day: row.day,
            credit_cents: 0,
            debit_cents: 0,
            count: 0,
        });

        match row.direction {
            Direction::Credit => {
                category_total.credit_cents += row.total_cents;
                day_total.credit_cents += row.total_cents;
                total_credit_cents += row.total_cents;
            }
            Direction::Debit => {
                category_total.debit_cents += row.total_cents;
                day_total.debit_cents += row.total_cents;
                total_debit_cents += row.total_cents;
            }
        }
        category_total.count += row.count;
        day_total.count += row.count;
        transaction_count += row.count;
    }

    SpendingSummary {
        wallet_id,
        start_date: filter.start,
        end_date: filter.end,
        total_credit_cents,
        total_debit_cents,
        net_cents: total_credit_cents - total_debit_cents,
        transaction_count,
        by_category: by_category.into_values().collect(),
        by_day: by_day.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        models::{
            analytics::AnalyticsQuery,
            transaction::TransactionKind,
            user::{NewUser, Role},
        },
        services::wallet_service,
        store::memory::MemoryStore,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> TransactionFilter {
        AnalyticsQuery {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        }
        .into_filter()
        .unwrap()
    }

    async fn new_wallet(store: &MemoryStore) -> Uuid {
        let mut uow = store.begin().await.unwrap();
        let user = uow
            .insert_user(NewUser {
                name: "Analyst".to_string(),
                email: "analyst@example.com".to_string(),
                password_hash: "x".to_string(),
                verified: true,
                role: Role::User,
            })
            .await
            .unwrap();
        let wallet = uow.insert_wallet(user.id, "KES").await.unwrap();
        uow.commit().await.unwrap();
        wallet.id
    }

    /// Deposit 5000 on Jan 3, then purchase 3000 Rent and withdraw 500 on Jan 10.
    async fn seeded_ledger(store: &MemoryStore) -> Uuid {
        let wallet_id = new_wallet(store).await;

        let deposit = wallet_service::execute_deposit(store, wallet_id, 5_000, None)
            .await
            .unwrap();
        let rent =
            wallet_service::execute_purchase(store, wallet_id, 3_000, "Rent".to_string(), None)
                .await
                .unwrap();
        let cash = wallet_service::execute_withdrawal(store, wallet_id, 500, None, None)
            .await
            .unwrap();

        let jan = |d| Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap();
        store
            .backdate_transaction(deposit.transaction.id, jan(3))
            .await;
        store.backdate_transaction(rent.transaction.id, jan(10)).await;
        store.backdate_transaction(cash.transaction.id, jan(10)).await;
        wallet_id
    }

    #[tokio::test]
    async fn summary_groups_by_category_and_day() {
        let store = MemoryStore::new();
        let wallet_id = seeded_ledger(&store).await;

        let summary = summarize(&store, wallet_id, &range(date(2025, 1, 1), date(2025, 1, 31)))
            .await
            .unwrap();

        assert_eq!(summary.total_credit_cents, 5_000);
        assert_eq!(summary.total_debit_cents, 3_500);
        assert_eq!(summary.net_cents, 1_500);
        assert_eq!(summary.transaction_count, 3);

        let categories: Vec<&str> = summary
            .by_category
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(categories, vec!["Rent", UNCATEGORIZED]);
        assert_eq!(summary.by_category[0].debit_cents, 3_000);
        assert_eq!(summary.by_category[1].credit_cents, 5_000);
        assert_eq!(summary.by_category[1].debit_cents, 500);

        assert_eq!(summary.by_day.len(), 2);
        assert_eq!(summary.by_day[0].day, date(2025, 1, 3));
        assert_eq!(summary.by_day[1].debit_cents, 3_500);
        assert_eq!(summary.by_day[1].count, 2);
    }

    #[tokio::test]
    async fn range_bounds_are_inclusive() {
        let store = MemoryStore::new();
        let wallet_id = seeded_ledger(&store).await;

        let summary = summarize(&store, wallet_id, &range(date(2025, 1, 10), date(2025, 1, 10)))
            .await
            .unwrap();
        assert_eq!(summary.transaction_count, 2);
        assert_eq!(summary.total_credit_cents, 0);
    }

    #[tokio::test]
    async fn empty_range_yields_zero_totals() {
        let store = MemoryStore::new();
        let wallet_id = seeded_ledger(&store).await;

        let summary = summarize(&store, wallet_id, &range(date(2024, 6, 1), date(2024, 6, 30)))
            .await
            .unwrap();
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.net_cents, 0);
        assert!(summary.by_category.is_empty());
        assert!(summary.by_day.is_empty());
    }

    #[tokio::test]
    async fn statement_filters_by_kind_newest_first() {
        let store = MemoryStore::new();
        let wallet_id = seeded_ledger(&store).await;

        let mut filter = range(date(2025, 1, 1), date(2025, 1, 31));
        let all = statement(&store, wallet_id, &filter).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().unwrap().kind, TransactionKind::Deposit);

        filter.kind = Some(TransactionKind::Purchase);
        let purchases = statement(&store, wallet_id, &filter).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].category.as_deref(), Some("Rent"));
    }

    #[tokio::test]
    async fn unknown_wallet_is_not_found() {
        let store = MemoryStore::new();
        let filter = range(date(2025, 1, 1), date(2025, 1, 31));
        assert!(matches!(
            summarize(&store, Uuid::new_v4(), &filter).await,
            Err(AppError::NotFound("Wallet"))
        ));
    }
}
