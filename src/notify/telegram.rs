use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Notifier;
use crate::error::DeliveryError;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Minimal Telegram Bot API client: `sendMessage` and `getUpdates`.
#[derive(Clone)]
pub struct TelegramBot {
    token: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl TelegramBot {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Point the client at another Bot API host (local bot server, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let body = SendMessage {
            chat_id,
            text,
            disable_web_page_preview: false,
        };
        let rsp = self
            .client
            .post(self.method_url("sendMessage"))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(format!("telegram sendMessage: {e}")))?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ApiResponse<serde_json::Value> = rsp
            .json()
            .await
            .map_err(|e| DeliveryError::Http(format!("telegram response body: {e}")))?;
        check_ok(parsed).map(|_| ())
    }

    /// Long-poll for updates after `offset`. `poll_secs` is the server-side wait.
    pub async fn get_updates(&self, offset: i64, poll_secs: u64) -> Result<Vec<Update>, DeliveryError> {
        let rsp = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset.to_string()), ("timeout", poll_secs.to_string())])
            .timeout(Duration::from_secs(poll_secs) + self.timeout)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(format!("telegram getUpdates: {e}")))?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ApiResponse<Vec<Update>> = rsp
            .json()
            .await
            .map_err(|e| DeliveryError::Http(format!("telegram updates body: {e}")))?;
        Ok(check_ok(parsed)?.unwrap_or_default())
    }
}

fn check_ok<T>(rsp: ApiResponse<T>) -> Result<Option<T>, DeliveryError> {
    if rsp.ok {
        Ok(rsp.result)
    } else {
        Err(DeliveryError::Api(
            rsp.description.unwrap_or_else(|| "unknown error".into()),
        ))
    }
}

/// Delivers change messages to one chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: TelegramBot,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot: TelegramBot::new(token),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        self.bot.send_message(&self.chat_id, text).await
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
