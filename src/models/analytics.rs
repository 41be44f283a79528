//! Analytics filters and aggregate response shapes.

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::{Direction, TransactionKind, TransactionResponse};
use crate::error::AppError;

/// Window used when the caller gives no `start_date`.
pub const DEFAULT_WINDOW_DAYS: u64 = 90;

/// Label given to entries recorded without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Query string accepted by the analytics endpoints.
///
/// `GET /api/v1/analytics/summary?start_date=2025-01-01&end_date=2025-03-31&category=Rent`
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub kind: Option<TransactionKind>,
}

impl AnalyticsQuery {
    /// Resolve defaults and validate the date range.
    ///
    /// Dates are inclusive. `end_date` defaults to today (UTC) and
    /// `start_date` to [`DEFAULT_WINDOW_DAYS`] before `end_date`.
    pub fn into_filter(self) -> Result<TransactionFilter, AppError> {
        let end = self.end_date.unwrap_or_else(|| Utc::now().date_naive());
        let start = match self.start_date {
            Some(start) => start,
            None => end
                .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
                .ok_or_else(|| AppError::validation("end_date is out of range"))?,
        };

        if start > end {
            return Err(AppError::validation(
                "start_date must not be after end_date",
            ));
        }

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(TransactionFilter {
            start,
            end,
            category,
            kind: self.kind,
        })
    }
}

/// Resolved filter passed down to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub category: Option<String>,
    pub kind: Option<TransactionKind>,
}

/// One aggregate row as produced by the store's GROUP BY (day, category, direction).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryRow {
    pub day: NaiveDate,
    pub category: Option<String>,
    #[sqlx(try_from = "String")]
    pub direction: Direction,
    pub total_cents: i64,
    pub count: i64,
}

/// Totals for one spending category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub credit_cents: i64,
    pub debit_cents: i64,
    pub count: i64,
}

/// Totals for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    pub day: NaiveDate,
    pub credit_cents: i64,
    pub debit_cents: i64,
    pub count: i64,
}

/// Response body for `GET /api/v1/analytics/summary`.
///
/// # JSON Example
///
/// ```json
/// {
///   "wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "start_date": "2025-01-01",
///   "end_date": "2025-03-31",
///   "total_credit_cents": 500000,
///   "total_debit_cents": 300000,
///   "net_cents": 200000,
///   "transaction_count": 3,
///   "by_category": [{ "category": "Rent", "credit_cents": 0, "debit_cents": 300000, "count": 1 }],
///   "by_day": [{ "day": "2025-01-03", "credit_cents": 500000, "debit_cents": 300000, "count": 3 }]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SpendingSummary {
    pub wallet_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_credit_cents: i64,
    pub total_debit_cents: i64,
    pub net_cents: i64,
    pub transaction_count: i64,
    pub by_category: Vec<CategoryTotal>,
    pub by_day: Vec<DayTotal>,
}

/// Response body for `GET /api/v1/analytics/statement`.
#[derive(Debug, Serialize)]
pub struct StatementResponse {
    pub wallet_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub transactions: Vec<TransactionResponse>,
}
