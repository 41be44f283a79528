//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, query string, auth context)
//! 2. Validates input and calls the matching service
//! 3. Returns HTTP response (JSON, status code)

/// Admin-only user management and reporting
pub mod admin;
/// Spending summary and statement endpoints
pub mod analytics;
/// Registration, login, verification and password reset
pub mod auth;
/// Service health check
pub mod health;
/// Caller's own profile and account requests
pub mod users;
/// Wallet lookups and money movement
pub mod wallet;
