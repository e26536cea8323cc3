use reqwest::Client;
use std::time::Duration;

use super::Notifier;
use crate::error::DeliveryError;

pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let body = serde_json::json!({ "text": text });

        let rsp = self
            .client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(format!("slack post: {e}")))?;

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
        "slack"
    }
}
