// src/app.rs
//! Wires config, engine, notifier and command listener into background tasks
//! that share one shutdown signal.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::commands::{spawn_telegram_commands, CommandDispatcher};
use crate::config::WatchConfig;
use crate::notify::{self, telegram::TelegramBot, Notifier, STARTUP_MESSAGE};
use crate::watch::providers::listing_html::HtmlListingFetcher;
use crate::watch::scheduler::{run_scheduler, shutdown_requested, SchedulerCfg};
use crate::watch::{PollCycle, SourceFetcher, WatchState};

pub struct Watcher {
    cfg: WatchConfig,
    state: Arc<WatchState>,
    cycle: Arc<PollCycle>,
    notifier: Arc<dyn Notifier>,
    telegram_token: Option<String>,
}

pub struct WatcherHandles {
    pub scheduler: JoinHandle<()>,
    pub commands: Option<JoinHandle<()>>,
}

impl WatcherHandles {
    /// Wait for every background task to finish (after shutdown was signalled).
    pub async fn join(self) {
        if let Err(e) = self.scheduler.await {
            tracing::error!(error = %e, "scheduler task panicked");
        }
        if let Some(h) = self.commands {
            if let Err(e) = h.await {
                tracing::error!(error = %e, "command task panicked");
            }
        }
    }
}

impl Watcher {
    /// Live setup: HTML fetcher, notifier and command listener from env.
    pub fn from_config(cfg: WatchConfig) -> Result<Self> {
        let fetcher = HtmlListingFetcher::new(cfg.extract.clone(), cfg.fetch_timeout())
            .context("building listing fetcher")?;
        let notifier = notify::from_env(cfg.notification_target.as_deref());
        let mut w = Self::with_parts(cfg, Arc::new(fetcher), notifier);
        w.telegram_token = notify::telegram_token_from_env();
        Ok(w)
    }

    /// Setup with explicit collaborators; no command listener.
    pub fn with_parts(
        cfg: WatchConfig,
        fetcher: Arc<dyn SourceFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let state = Arc::new(WatchState::new(cfg.sources.clone()));
        let cycle = Arc::new(
            PollCycle::new(state.clone(), fetcher, notifier.clone())
                .with_fetch_timeout(cfg.fetch_timeout()),
        );
        Self {
            cfg,
            state,
            cycle,
            notifier,
            telegram_token: None,
        }
    }

    pub fn state(&self) -> Arc<WatchState> {
        self.state.clone()
    }

    /// Start the scheduler (preceded by the optional startup announcement)
    /// and, when Telegram is configured, the command listener.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> WatcherHandles {
        tracing::info!(
            sources = self.state.len(),
            interval_secs = self.cfg.poll_interval_secs,
            channel = self.notifier.name(),
            "starting watcher"
        );

        let commands = match (&self.telegram_token, &self.cfg.notification_target) {
            (Some(token), Some(chat)) => Some(spawn_telegram_commands(
                TelegramBot::new(token.clone()),
                chat.clone(),
                CommandDispatcher::new(self.state.clone()),
                shutdown.clone(),
            )),
            _ => None,
        };

        let announce = self.cfg.announce_startup;
        let notifier = self.notifier;
        let cycle = self.cycle;
        let sched_cfg = SchedulerCfg {
            interval: self.cfg.poll_interval(),
        };
        let mut shutdown = shutdown;
        let scheduler = tokio::spawn(async move {
            if announce {
                tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut shutdown) => return,
                    res = notifier.send(STARTUP_MESSAGE) => {
                        if let Err(e) = res {
                            tracing::warn!(error = %e, "startup message not delivered");
                        }
                    }
                }
            }
            run_scheduler(cycle, sched_cfg, shutdown).await;
        });

        WatcherHandles {
            scheduler,
            commands,
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;
    use crate::watch::providers::scripted::ScriptedFetcher;
    use crate::watch::{Item, Source};
    use std::time::Duration;

    #[tokio::test]
    async fn announces_then_polls_silently_first() {
        let cfg = WatchConfig {
            sources: vec![Source::new("Jobs", "siteA/jobs")],
            poll_interval_secs: 3600,
            ..WatchConfig::default()
        };
        let fetcher = ScriptedFetcher::new();
        fetcher.push("Jobs", Ok(Item::new("Role X", "siteA/jobs/1")));
        let notifier = Arc::new(MockNotifier::new());
        let w = Watcher::with_parts(cfg, Arc::new(fetcher), notifier.clone());
        let state = w.state();

        let (tx, rx) = watch::channel(false);
        let handles = w.spawn(rx);
        assert!(handles.commands.is_none());

        for _ in 0..50 {
            if state.cycles_completed() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        handles.join().await;

        assert_eq!(notifier.messages(), vec![STARTUP_MESSAGE.to_string()]);
        assert_eq!(
            state.read("Jobs").unwrap().last_item,
            Some(Item::new("Role X", "siteA/jobs/1"))
        );
    }
}
