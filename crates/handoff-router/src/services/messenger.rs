use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::ChannelConfig;
use crate::models::webhook::SendTextRequest;
use crate::utils::error::ServiceError;

/// Outbound text delivery to a channel user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), ServiceError>;
}

/// WhatsApp Cloud API sender
#[derive(Clone)]
pub struct WhatsAppSender {
    client: Client,
    messages_url: String,
    access_token: String,
}

impl WhatsAppSender {
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
                .build()
                .unwrap_or_else(|_| Client::new()),
            messages_url: format!(
                "{}/{}/messages",
                config.graph_base_url.trim_end_matches('/'),
                config.phone_number_id
            ),
            access_token: config.access_token.clone(),
        }
    }
}

#[async_trait]
impl MessageSender for WhatsAppSender {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(&SendTextRequest::new(to, body))
            .send()
            .await
            .map_err(|e| ServiceError::Send(format!("Graph API request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ServiceError::Send(format!(
                "Graph API error ({}): {}",
                status, text
            )));
        }

        debug!("WhatsApp accepted message to {}: {}", to, text);
        Ok(())
    }
}
