use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::error::DeliveryError;

/// Discord caps message content at 2000 characters.
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let payload = DiscordWebhookPayload::text(text);

        let rsp = self
            .client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(format!("Discord webhook request failed: {e}")))?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: rsp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: String,
}

impl DiscordWebhookPayload {
    fn text(text: &str) -> Self {
        Self {
            content: text.chars().take(MAX_CONTENT_CHARS).collect(),
        }
    }
}
