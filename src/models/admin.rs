//! Admin request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{Role, UserResponse};

/// Largest page accepted by `GET /api/v1/admin/users`.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination query for user listings.
#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub start: i64,

    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// Page of users returned to admins.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub start: i64,
    pub limit: i64,
}

/// `GET /api/v1/admin/users/lookup?email=...`
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// Activate or deactivate a user.
///
/// ```json
/// { "email": "john_doe@example.com", "active": false }
/// ```
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub email: String,
    pub active: bool,
}

/// Change a user's role (master-admin only).
///
/// ```json
/// { "email": "john_doe@example.com", "role": "admin" }
/// ```
#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub email: String,
    pub role: Role,
}

/// Aggregate counters shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SystemStats {
    pub total_users: i64,
    pub verified_users: i64,
    pub active_users: i64,
    pub total_wallets: i64,
    pub total_transactions: i64,
    pub total_balance_cents: i64,
}

/// A user's request to have their account removed.
///
/// # Database Table
///
/// Maps to the `account_removal_requests` table. Requests are processed
/// manually by an operator; this service only records them.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AccountRemovalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub details: Option<String>,
    pub status: String,
    pub requested_at: DateTime<Utc>,
}
