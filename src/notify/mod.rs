// src/notify/mod.rs
pub mod discord;
pub mod slack;
pub mod telegram;

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::DeliveryError;
use crate::watch::types::Item;

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;

/// Outbound channel to the single recipient.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
    fn name(&self) -> &'static str;
}

pub const STARTUP_MESSAGE: &str = "✅ Watcher started and running!";

/// Message announcing a new first item on `source`.
pub fn format_change_message(source: &str, item: &Item) -> String {
    format!("🆕 New in {}:\n{}\n{}", source, item.title, item.link)
}

/// Pick the delivery channel from the environment:
/// Telegram (TOKEN / TELEGRAM_BOT_TOKEN + chat id) > Slack > Discord > log only.
pub fn from_env(chat_id: Option<&str>) -> Arc<dyn Notifier> {
    match (telegram_token_from_env(), chat_id) {
        (Some(token), Some(chat)) => return Arc::new(TelegramNotifier::new(token, chat)),
        (Some(_), None) => {
            tracing::warn!("Telegram token set but no chat id configured; Telegram disabled")
        }
        _ => {}
    }
    if let Some(url) = env_non_empty("SLACK_WEBHOOK_URL") {
        return Arc::new(SlackNotifier::new(url));
    }
    if let Some(url) = env_non_empty("DISCORD_WEBHOOK_URL") {
        return Arc::new(DiscordNotifier::new(url));
    }
    tracing::warn!("no notification channel configured; changes will only be logged");
    Arc::new(LogNotifier)
}

/// Bot token from TELEGRAM_BOT_TOKEN, falling back to TOKEN.
pub fn telegram_token_from_env() -> Option<String> {
    env_non_empty("TELEGRAM_BOT_TOKEN").or_else(|| env_non_empty("TOKEN"))
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Fallback channel: writes the message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        tracing::info!(target: "notify", "{text}");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// --- Test helper ---
/// Records every message; can be told to fail.
pub struct MockNotifier {
    pub sent: Mutex<Vec<String>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail: false,
        }
    }

    /// A notifier whose every delivery fails (the attempt is still recorded).
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        if self.fail {
            return Err(DeliveryError::Http("mock channel down".into()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
