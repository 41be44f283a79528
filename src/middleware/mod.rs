//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Enforce role checks
//! - Short-circuit requests (reject unauthorized)

/// Bearer token authentication and admin gate
pub mod auth;
