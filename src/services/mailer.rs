use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::{AppError, Result};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html: &str) -> Result<()>;
}

/// Posts messages to a Resend-compatible HTTP API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: &str, api_key: &str, from: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Mail(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, recipient: &str, subject: &str, html: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [recipient],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!("mail API returned {}: {}", status, body)));
        }

        Ok(())
    }
}

/// Used when no mail API is configured; writes the subject to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, subject: &str, _html: &str) -> Result<()> {
        info!(recipient, subject, "Mail delivery disabled; message not sent");
        Ok(())
    }
}

pub fn create_mailer(config: &Config) -> Result<Box<dyn Mailer>> {
    match (&config.mail_api_url, &config.mail_api_key) {
        (Some(url), Some(key)) => Ok(Box::new(HttpMailer::new(url, key, &config.mail_from)?)),
        _ => Ok(Box::new(LogMailer)),
    }
}

/// Sends a message without letting a delivery failure reach the caller.
pub async fn send_best_effort(mailer: &dyn Mailer, recipient: &str, subject: &str, html: &str) {
    if let Err(e) = mailer.send(recipient, subject, html).await {
        warn!(recipient, subject, error = %e, "Mail delivery failed");
    }
}

fn wrap(content: &str) -> String {
    format!(
        r#"<div style="font-family: sans-serif; line-height: 1.5; color: #333;">
  <div style="padding: 1rem; border: 1px solid #eee; border-radius: 8px; max-width: 600px; margin: auto;">
    <h2 style="color: #0057B7; text-align: center;">PromptVerse Community</h2>
    {}
    <hr style="margin: 2rem 0;" />
    <p style="font-size: 0.9rem; color: #888;">If you didn't request this email, you can safely ignore it.</p>
  </div>
</div>"#,
        content
    )
}

pub fn otp_email(otp: &str, ttl_minutes: i64) -> String {
    wrap(&format!(
        "<p>Hello,</p><p>Your verification code is:</p><h2>{}</h2><p>This code expires in {} minutes.</p>",
        otp, ttl_minutes
    ))
}

pub fn welcome_email(username: &str) -> String {
    wrap(&format!(
        "<p>Hi {},</p><p>Your account is verified. Pick a plan, join a community and start sharing prompts.</p>",
        username
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_mailer_posts_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer key-123"))
            .and(body_partial_json(json!({
                "to": ["bob@example.com"],
                "subject": "Verify your account"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&server.uri(), "key-123", "PromptVerse <noreply@example.com>").unwrap();
        mailer
            .send("bob@example.com", "Verify your account", &otp_email("123456", 10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_delivery_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(&server.uri(), "key", "from@example.com").unwrap();
        assert!(mailer.send("bob@example.com", "s", "b").await.is_err());
        send_best_effort(&mailer, "bob@example.com", "s", "b").await;
    }

    #[test]
    fn test_otp_email_contains_code() {
        let html = otp_email("654321", 10);
        assert!(html.contains("654321"));
        assert!(html.contains("10 minutes"));
    }
}
