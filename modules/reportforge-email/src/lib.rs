//! Client for the internal notification-API email gateway.

pub mod error;

pub use error::{EmailError, Result};

use std::time::Duration;

use async_trait::async_trait;

/// The gateway surface the orchestrator depends on. Implemented over HTTP in
/// production and stubbed in tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send an HTML email with one binary attachment.
    async fn send_attachment(
        &self,
        to: &str,
        subject: &str,
        body_html: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<()>;

    /// Send an HTML email without attachments.
    async fn send_plain(&self, to: &str, subject: &str, body_html: &str) -> Result<()>;
}

/// Routing metadata added to every gateway call.
#[derive(Debug, Clone)]
pub struct EmailOptions {
    pub from: String,
    pub team_tag: String,
    pub product_tag: String,
}

pub struct EmailClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    options: EmailOptions,
}

impl EmailClient {
    pub fn new(base_url: &str, token: &str, options: EmailOptions) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            options,
        }
    }

    fn base_form(&self, to: &str, subject: &str, body_html: &str) -> reqwest::multipart::Form {
        reqwest::multipart::Form::new()
            .text("from", self.options.from.clone())
            .text("to", to.to_string())
            .text("subject", subject.to_string())
            .text("bodyHtml", body_html.to_string())
            .text("teamTag", self.options.team_tag.clone())
            .text("productTag", self.options.product_tag.clone())
    }

    async fn post_form(&self, form: reqwest::multipart::Form) -> Result<()> {
        let url = format!("{}/email/send", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailClient {
    async fn send_attachment(
        &self,
        to: &str,
        subject: &str,
        body_html: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<()> {
        let size = bytes.len();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")?;
        let form = self
            .base_form(to, subject, body_html)
            .part("attachment", part);

        self.post_form(form).await?;
        tracing::info!(to, filename, size, "Sent email with attachment");
        Ok(())
    }

    async fn send_plain(&self, to: &str, subject: &str, body_html: &str) -> Result<()> {
        let form = self.base_form(to, subject, body_html);
        self.post_form(form).await?;
        tracing::info!(to, subject, "Sent email");
        Ok(())
    }
}
