//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They open units of work, enforce business rules, and send email.

/// Role-gated user management and reporting
pub mod admin_service;
/// Spending summaries and statements
pub mod analytics_service;
/// Registration, verification, login and password reset
pub mod auth_service;
/// Outgoing email contract and implementations
pub mod email_service;
/// Self-service profile operations
pub mod user_service;
/// Deposits, withdrawals, purchases and transfers
pub mod wallet_service;
