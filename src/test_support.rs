//! Shared fixtures for in-crate tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    config::Config,
    models::user::{RegisterRequest, Role, User},
    services::{
        auth_service,
        email_service::{EmailError, EmailMessage, EmailSender},
    },
    state::AppState,
    store::memory::MemoryStore,
};

/// Password given to every user created by [`TestApp::verified_user`].
pub const TEST_PASSWORD: &str = "correct horse";

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn all(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
        self.all().into_iter().filter(|m| m.to == to).collect()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Application state wired to an in-memory store and a recording mailer.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(RecordingMailer::default())
    }

    /// Every send fails with a provider error.
    pub fn with_failing_mailer() -> Self {
        Self::build(RecordingMailer {
            fail: true,
            ..Default::default()
        })
    }

    fn build(mailer: RecordingMailer) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let state = AppState::new(Config::for_tests(), store.clone(), mailer.clone());
        Self {
            state,
            store,
            mailer,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Create an active, verified user (with wallet) whose password is [`TEST_PASSWORD`].
    pub async fn verified_user(&self, email: &str, role: Role) -> User {
        auth_service::create_account(
            &self.state,
            RegisterRequest {
                name: "Test User".to_string(),
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
            },
            true,
            role,
        )
        .await
        .unwrap()
    }

    /// Bearer token for `user`.
    pub fn access_token(&self, user: &User) -> String {
        self.state
            .tokens
            .issue_access(user.id, chrono::Duration::minutes(5))
            .unwrap()
    }
}

/// Pull the `token` query parameter out of an emailed link.
pub fn token_from_link(message: &EmailMessage) -> String {
    let start = message
        .html_body
        .find("token=")
        .expect("message carries no token link")
        + "token=".len();
    message.html_body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect()
}
