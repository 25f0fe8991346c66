use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub message: String,
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> anyhow::Result<()>;
}

/// Client for a JSON email API (Postmark-compatible `POST /email`).
pub struct HttpMailer {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    sender: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text_body: &'a str,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("build mail http client")?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            sender: config.sender.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        let url = format!("{}/email", self.base_url);
        let body = SendEmailRequest {
            from: &self.sender,
            to: &email.to,
            subject: &email.subject,
            text_body: &email.message,
        };
        self.http
            .post(&url)
            .header("X-Postmark-Server-Token", &self.api_token)
            .json(&body)
            .send()
            .await
            .context("send email request")?
            .error_for_status()
            .context("email api rejected message")?;
        debug!("email sent");
        Ok(())
    }
}
