//! Outgoing email.
//!
//! Services depend only on [`EmailSender`]: "send this subject and HTML body
//! to this recipient". Two implementations exist:
//! - [`HttpEmailSender`]: posts to a transactional email API (Brevo-compatible JSON)
//! - [`LogEmailSender`]: writes the message to the log, used when no API key is configured
//!
//! Delivery failures never fail the request that triggered them; [`deliver`]
//! logs them instead.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("email provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Sends email through an HTTP API.
///
/// # Request Sent
///
/// `POST <EMAIL_API_URL>` with headers `api-key: <EMAIL_API_KEY>` and
/// `Content-Type: application/json`:
///
/// ```json
/// {
///   "sender": { "name": "Wallet Team", "email": "no-reply@example.com" },
///   "to": [{ "email": "jane@example.com" }],
///   "subject": "Activate your account",
///   "htmlContent": "<html>...</html>"
/// }
/// ```
///
/// # Timeout
///
/// 5 seconds per message (prevents hanging on a slow provider)
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl HttpEmailSender {
    pub fn new(api_url: String, api_key: String, sender: String) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            api_url,
            api_key,
            sender,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let payload = json!({
            "sender": { "name": "Wallet Team", "email": self.sender },
            "to": [{ "email": message.to }],
            "subject": message.subject,
            "htmlContent": message.html_body,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %message.to, subject = %message.subject, "email accepted by provider");
        Ok(())
    }
}

/// Development sender: logs instead of sending.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.html_body,
            "email delivery disabled, logging message"
        );
        Ok(())
    }
}

/// Send a message, logging rather than propagating failures.
pub async fn deliver(mailer: &dyn EmailSender, message: EmailMessage) {
    if let Err(e) = mailer.send(&message).await {
        tracing::error!("Failed to send email to {}: {:?}", message.to, e);
    }
}

/// Email asking a new user to confirm their address.
pub fn verification_email(to: &str, name: &str, link: &str) -> EmailMessage {
    let name = escape_html(name);
    let link = escape_html(link);
    EmailMessage {
        to: to.to_string(),
        subject: "Activate your account".to_string(),
        html_body: format!(
            r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6;">
  <h2>Welcome, {name}!</h2>
  <p>Confirm your email address to start using your wallet.</p>
  <p><a href="{link}">Verify my account</a></p>
  <p>If the button above doesn't work, copy and paste this link into your browser:</p>
  <p style="word-break: break-all;">{link}</p>
</body>
</html>"#
        ),
    }
}

/// Email carrying a password reset link.
pub fn password_reset_email(to: &str, name: &str, link: &str, ttl_minutes: i64) -> EmailMessage {
    let name = escape_html(name);
    let link = escape_html(link);
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        html_body: format!(
            r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6;">
  <h2>Hello {name},</h2>
  <p>We received a request to reset your password. The link below expires in {ttl_minutes} minutes and can be used once.</p>
  <p><a href="{link}">Choose a new password</a></p>
  <p style="word-break: break-all;">{link}</p>
  <p>If you did not request this, you can ignore this email.</p>
</body>
</html>"#
        ),
    }
}

/// Acknowledgement of an account removal request.
pub fn account_removal_email(to: &str, name: &str, support_email: &str) -> EmailMessage {
    let name = escape_html(name);
    let support_email = escape_html(support_email);
    EmailMessage {
        to: to.to_string(),
        subject: "Account removal request received".to_string(),
        html_body: format!(
            r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6;">
  <h2>Account removal request received</h2>
  <p>Hello {name},</p>
  <p>We have logged your request to remove your account. Processing takes up to 30 days and you will be emailed once it is complete.</p>
  <p>If this request was made in error, contact <a href="mailto:{support_email}">{support_email}</a>.</p>
</body>
</html>"#
        ),
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_escape_user_supplied_names() {
        let message = verification_email(
            "jane@example.com",
            "<script>alert(1)</script>",
            "http://api.test/verify?token=a&b",
        );
        assert!(!message.html_body.contains("<script>"));
        assert!(message.html_body.contains("&lt;script&gt;"));
        assert!(message.html_body.contains("token=a&amp;b"));
    }

    #[test]
    fn reset_email_mentions_expiry() {
        let message = password_reset_email("jane@example.com", "Jane", "http://app.test/x", 30);
        assert_eq!(message.subject, "Reset your password");
        assert!(message.html_body.contains("30 minutes"));
    }
}
