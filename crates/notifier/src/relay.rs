//! Mailer backed by the notification relay service.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{NotifierError, Result};
use crate::mailer::Mailer;

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    email_to: &'a str,
    subject: &'a str,
    content: &'a str,
    send_now: bool,
}

/// Mailer that POSTs to the notification relay's send-email endpoint.
///
/// The relay owns the SMTP session; from here a send is one HTTP round
/// trip, and any non-success answer counts as a failed attempt.
#[derive(Clone)]
pub struct RelayMailer {
    client: reqwest::Client,
    base_url: String,
}

impl RelayMailer {
    /// Creates a relay mailer against the given service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let url = format!("{}/api/v1/send-email", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SendEmailRequest {
                email_to: to,
                subject,
                content: body,
                send_now: true,
            })
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifierError::Transport(format!(
                "relay returned {status}: {message}"
            )));
        }

        Ok(())
    }
}
