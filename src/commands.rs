//! Inbound chat commands. Replies are rendered from the read-only query
//! views; nothing here triggers a fetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::notify::telegram::TelegramBot;
use crate::watch::query;
use crate::watch::scheduler::shutdown_requested;
use crate::watch::WatchState;

const HELP: &str = "Commands:\n/status - last check time per page\n/latest - newest item per page";

/// Long-poll wait passed to `getUpdates`.
const POLL_SECS: u64 = 25;
/// Pause after a failed `getUpdates` call.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct CommandDispatcher {
    state: Arc<WatchState>,
}

impl CommandDispatcher {
    pub fn new(state: Arc<WatchState>) -> Self {
        Self { state }
    }

    /// Reply for a chat message, or `None` if it is not a known command.
    /// Accepts the `/cmd@botname` form Telegram uses in groups.
    pub fn handle(&self, text: &str) -> Option<String> {
        let first = text.split_whitespace().next()?;
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd {
            "/status" => Some(query::render_status(&query::status(&self.state))),
            "/latest" => Some(query::render_latest(&query::latest(&self.state))),
            "/start" | "/help" => Some(HELP.to_string()),
            _ => None,
        }
    }
}

/// Answer commands from `chat_id` until `shutdown` flips.
pub fn spawn_telegram_commands(
    bot: TelegramBot,
    chat_id: String,
    dispatcher: CommandDispatcher,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut offset: i64 = 0;
        loop {
            let updates = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                r = bot.get_updates(offset, POLL_SECS) => r,
            };

            let updates = match updates {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!(target: "commands", error = %e, "getUpdates failed");
                    tokio::select! {
                        biased;
                        _ = shutdown_requested(&mut shutdown) => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => continue,
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(msg) = update.message else { continue };
                if msg.chat.id.to_string() != chat_id {
                    tracing::debug!(target: "commands", chat = msg.chat.id, "ignoring foreign chat");
                    continue;
                }
                let Some(reply) = msg.text.as_deref().and_then(|t| dispatcher.handle(t)) else {
                    continue;
                };
                if let Err(e) = bot.send_message(&chat_id, &reply).await {
                    tracing::warn!(target: "commands", error = %e, "reply failed");
                }
            }
        }
        tracing::info!(target: "commands", "command listener stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::{Item, Source};
    use chrono::Utc;

    fn dispatcher() -> CommandDispatcher {
        let state = Arc::new(WatchState::new(vec![Source::new("Jobs", "siteA/jobs")]));
        state
            .compare_and_update("Jobs", Item::new("Role X", "siteA/jobs/1"), Utc::now())
            .unwrap();
        CommandDispatcher::new(state)
    }

    #[test]
    fn known_commands_reply() {
        let d = dispatcher();
        assert!(d.handle("/latest").unwrap().contains("Role X"));
        assert!(d.handle("/status").unwrap().starts_with("✅ Running since"));
        assert_eq!(d.handle("/help").as_deref(), Some(HELP));
    }

    #[test]
    fn bot_suffix_and_arguments_are_ignored() {
        let d = dispatcher();
        assert!(d.handle("/latest@my_watch_bot now").unwrap().contains("siteA/jobs/1"));
    }

    #[test]
    fn other_text_gets_no_reply() {
        let d = dispatcher();
        assert_eq!(d.handle("hello"), None);
        assert_eq!(d.handle(""), None);
        assert_eq!(d.handle("/unknown"), None);
    }
}
