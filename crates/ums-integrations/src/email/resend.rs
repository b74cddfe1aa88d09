//! Resend HTTP API client.
//!
//! `POST /emails` with a bearer token; any non-2xx answer is an error carrying
//! the provider's message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use ums_core::entities::ExpiryWarning;
use ums_core::traits::{Notifier, RepoResult};

use super::{expiry_html, expiry_subject, EmailError};

/// Production endpoint for sending a single email
pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    html: String,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: String,
}

/// Sends expiry warnings through Resend
#[derive(Debug, Clone)]
pub struct ResendNotifier {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl ResendNotifier {
    /// Client against the production endpoint; `timeout` bounds each request
    pub fn new(
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmailError> {
        Self::with_endpoint(RESEND_API_URL, api_key, from, timeout)
    }

    /// Client against an arbitrary endpoint (tests, proxies)
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmailError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(EmailError::MissingApiKey);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            from: from.into(),
        })
    }

    /// Build from application config; `None` when the provider is not Resend
    pub fn from_config(
        config: &ums_common::EmailConfig,
        timeout: Duration,
    ) -> Option<Result<Self, EmailError>> {
        if config.provider != ums_common::EmailProvider::Resend {
            return None;
        }
        let key = config.resend_api_key.clone().unwrap_or_default();
        Some(Self::new(key, config.from.clone(), timeout))
    }

    /// Send one HTML email, returning the provider's message id
    #[instrument(skip(self, html))]
    pub async fn send(&self, to: &str, subject: String, html: String) -> Result<String, EmailError> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject,
            html,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ResendErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or(body);
            return Err(EmailError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SendEmailResponse = response.json().await?;
        debug!(id = %sent.id, "Email accepted by provider");
        Ok(sent.id)
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send_expiry_warning(&self, warning: &ExpiryWarning) -> RepoResult<()> {
        self.send(&warning.address, expiry_subject(warning), expiry_html(warning))
            .await?;
        Ok(())
    }
}
