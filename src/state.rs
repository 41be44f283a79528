//! Shared application state handed to every handler and middleware.

use std::sync::Arc;

use crate::{
    config::Config,
    security::token::TokenSigner,
    services::email_service::EmailSender,
    store::Store,
};

/// Cloned per request by Axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub tokens: TokenSigner,
    pub mailer: Arc<dyn EmailSender>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>, mailer: Arc<dyn EmailSender>) -> Self {
        let tokens = TokenSigner::new(config.token_secret.clone());
        Self {
            config: Arc::new(config),
            store,
            tokens,
            mailer,
        }
    }
}
