//! Data models representing database entities and API contracts.
//!
//! Each submodule holds the row types for one table plus the request and
//! response bodies of the endpoints built on it. Request types expose a
//! `validate()` method that handlers call before any service logic runs.

/// Admin request/response types and system statistics
pub mod admin;
/// Analytics filters and aggregate shapes
pub mod analytics;
/// Ledger entry model
pub mod transaction;
/// User accounts, roles and auth request bodies
pub mod user;
/// Wallet model and wallet operation bodies
pub mod wallet;

use serde::Serialize;

/// A text column held a value outside the enum it maps to.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Plain acknowledgement body used by endpoints with no richer payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
