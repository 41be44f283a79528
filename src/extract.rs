//! Request extractors whose rejections use the `AppError` JSON contract.
//!
//! Axum's own `Json` and `Query` answer a malformed body or query string with
//! a plain-text 4xx. These wrappers route the rejection through
//! [`AppError::Validation`] instead, so clients always get
//! `{"error": {"code": "validation_error", ...}}` with status 400.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
