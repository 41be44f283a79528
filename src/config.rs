//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `TOKEN_SECRET` (required): JWT signing key for access, verification and reset tokens
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `EMAIL_API_KEY` (optional): when absent, outgoing emails are only logged
///
/// Every other field has a default suitable for local development.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub token_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// Base URL used when building email verification links
    #[serde(default = "default_domain")]
    pub backend_domain: String,

    /// Base URL of the web client that hosts the password update form
    #[serde(default = "default_domain")]
    pub frontend_domain: String,

    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_minutes: i64,

    #[serde(default = "default_verification_ttl")]
    pub verification_token_ttl_minutes: i64,

    #[serde(default = "default_reset_ttl")]
    pub password_reset_token_ttl_minutes: i64,

    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,

    pub email_api_key: Option<String>,

    #[serde(default = "default_sender")]
    pub email_sender: String,

    #[serde(default = "default_support_email")]
    pub support_email: String,

    /// ISO 4217 code assigned to wallets created at registration
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Comma separated list of origins allowed by the CORS layer
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_domain() -> String {
    "http://localhost:3000".to_string()
}

fn default_access_ttl() -> i64 {
    60
}

fn default_verification_ttl() -> i64 {
    24 * 60
}

fn default_reset_ttl() -> i64 {
    30
}

fn default_email_api_url() -> String {
    "https://api.brevo.com/v3/smtp/email".to_string()
}

fn default_sender() -> String {
    "no-reply@localhost".to_string()
}

fn default_support_email() -> String {
    "support@localhost".to_string()
}

fn default_currency() -> String {
    "KES".to_string()
}

fn default_cors_origins() -> String {
    "http://localhost:3000".to_string()
}

/// Minimum accepted length of `TOKEN_SECRET` in bytes.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Longest accepted lifetime of any token (one year).
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 366;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("TOKEN_SECRET must be at least {MIN_TOKEN_SECRET_LEN} bytes")]
    WeakTokenSecret,

    #[error("{name} must be between 1 and {MAX_TOKEN_TTL_MINUTES} minutes, got {value}")]
    TokenTtlOutOfRange { name: &'static str, value: i64 },
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - `TOKEN_SECRET` is shorter than [`MIN_TOKEN_SECRET_LEN`]
    /// - A token TTL is not within 1..=[`MAX_TOKEN_TTL_MINUTES`]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(ConfigError::WeakTokenSecret);
        }

        let ttls = [
            ("ACCESS_TOKEN_TTL_MINUTES", self.access_token_ttl_minutes),
            (
                "VERIFICATION_TOKEN_TTL_MINUTES",
                self.verification_token_ttl_minutes,
            ),
            (
                "PASSWORD_RESET_TOKEN_TTL_MINUTES",
                self.password_reset_token_ttl_minutes,
            ),
        ];
        for (name, value) in ttls {
            if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&value) {
                return Err(ConfigError::TokenTtlOutOfRange { name, value });
            }
        }

        Ok(())
    }

    /// Parsed CORS origins, skipping blanks.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by in-crate tests; never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/wallet_test".to_string(),
            token_secret: "test-secret-key-that-is-at-least-32-bytes".to_string(),
            server_port: default_port(),
            database_max_connections: default_max_connections(),
            backend_domain: "http://api.test".to_string(),
            frontend_domain: "http://app.test".to_string(),
            access_token_ttl_minutes: default_access_ttl(),
            verification_token_ttl_minutes: default_verification_ttl(),
            password_reset_token_ttl_minutes: default_reset_ttl(),
            email_api_url: default_email_api_url(),
            email_api_key: None,
            email_sender: default_sender(),
            support_email: "help@wallet.test".to_string(),
            default_currency: default_currency(),
            cors_allowed_origins: "http://app.test, ,http://admin.test".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_skip_blank_entries() {
        let config = Config::for_tests();
        assert_eq!(
            config.cors_origins(),
            vec!["http://app.test".to_string(), "http://admin.test".to_string()]
        );
    }

    #[test]
    fn short_token_secret_is_rejected() {
        let mut config = Config::for_tests();
        config.token_secret = "short".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeakTokenSecret)
        ));
    }

    #[test]
    fn test_config_passes_validation() {
        assert!(Config::for_tests().validate().is_ok());
    }

    #[test]
    fn token_ttls_outside_range_are_rejected() {
        let mut config = Config::for_tests();
        config.access_token_ttl_minutes = -5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TokenTtlOutOfRange {
                name: "ACCESS_TOKEN_TTL_MINUTES",
                value: -5
            })
        ));

        let mut config = Config::for_tests();
        config.password_reset_token_ttl_minutes = i64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TokenTtlOutOfRange {
                name: "PASSWORD_RESET_TOKEN_TTL_MINUTES",
                ..
            })
        ));

        let mut config = Config::for_tests();
        config.verification_token_ttl_minutes = 0;
        assert!(config.validate().is_err());
    }
}
