//! HTTP mail API client for outbound email
//!
//! Sends plain HTML messages through a transactional mail provider's REST API.
//! No queuing and no retry: a send is attempted exactly once per call.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Mail API client
#[derive(Clone)]
pub struct MailClient {
    http_client: reqwest::Client,
    api_endpoint: String,
    api_key: String,
    from_address: String,
}

/// Outbound message payload
#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mail API response
#[derive(Debug, Deserialize)]
struct SendMailResponse {
    #[serde(default)]
    id: Option<String>,
}

impl MailClient {
    /// Create a new mail client
    pub fn new(api_endpoint: String, api_key: String, from_address: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_endpoint,
            api_key,
            from_address,
        }
    }

    /// Send a single HTML email
    pub async fn send_html(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        let request = SendMailRequest {
            from: &self.from_address,
            to,
            subject,
            html,
        };

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.api_endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::MailService(format!("send request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MailService(format!(
                "send returned {}: {}",
                status, body
            )));
        }

        let body: SendMailResponse = response
            .json()
            .await
            .map_err(|e| AppError::MailService(format!("failed to parse send response: {}", e)))?;

        tracing::debug!(to = %to, message_id = ?body.id, "email accepted by mail API");
        Ok(())
    }
}
