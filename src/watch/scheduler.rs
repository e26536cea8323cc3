// src/watch/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::watch::cycle::PollCycle;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval: Duration,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Run `cycle` now, then sleep `cfg.interval` after each pass, until
/// `shutdown` turns true (or its sender goes away). A cycle in flight at
/// shutdown is dropped at its next await point; store writes never span one.
pub async fn run_scheduler(
    cycle: Arc<PollCycle>,
    cfg: SchedulerCfg,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                tracing::info!(target: "watch", "shutdown during poll cycle");
                break;
            }
            sent = cycle.run_once() => {
                tracing::debug!(target: "watch", sent, "scheduled cycle done");
            }
        }
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break,
            _ = tokio::time::sleep(cfg.interval) => {}
        }
    }
    tracing::info!(target: "watch", "scheduler stopped");
}

/// Resolves once the flag is true. A dropped sender counts as shutdown.
pub async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Spawn [`run_scheduler`] on the current runtime.
pub fn spawn_scheduler(
    cycle: Arc<PollCycle>,
    cfg: SchedulerCfg,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run_scheduler(cycle, cfg, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;
    use crate::watch::providers::scripted::ScriptedFetcher;
    use crate::watch::state::WatchState;
    use crate::watch::types::{Item, Source, WatchRecord};

    #[tokio::test]
    async fn repeats_until_shutdown() {
        let state = Arc::new(WatchState::new(vec![Source::new("Jobs", "siteA/jobs")]));
        let cycle = Arc::new(PollCycle::new(
            state.clone(),
            Arc::new(ScriptedFetcher::new()),
            Arc::new(MockNotifier::new()),
        ));
        let (tx, rx) = watch::channel(false);
        let handle = spawn_scheduler(
            cycle,
            SchedulerCfg {
                interval: Duration::from_millis(10),
            },
            rx,
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();

        // Every cycle fails (empty script) yet the loop kept going.
        assert!(state.cycles_completed() >= 2);
        assert!(state.read("Jobs").unwrap().last_checked_at.is_some());
    }

    #[tokio::test]
    async fn dropped_sender_stops_scheduler() {
        let state = Arc::new(WatchState::new(vec![Source::new("Jobs", "siteA/jobs")]));
        let cycle = Arc::new(PollCycle::new(
            state,
            Arc::new(ScriptedFetcher::new()),
            Arc::new(MockNotifier::new()),
        ));
        let (tx, rx) = watch::channel(false);
        let handle = spawn_scheduler(cycle, SchedulerCfg::default(), rx);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn slow_cycle_is_followed_by_a_full_interval() {
        let state = Arc::new(WatchState::new(vec![Source::new("Jobs", "siteA/jobs")]));
        let fetcher = ScriptedFetcher::new().with_delay("Jobs", Duration::from_millis(150));
        let cycle = Arc::new(PollCycle::new(
            state.clone(),
            Arc::new(fetcher),
            Arc::new(MockNotifier::new()),
        ));
        let (tx, rx) = watch::channel(false);
        let handle = spawn_scheduler(
            cycle,
            SchedulerCfg {
                interval: Duration::from_millis(100),
            },
            rx,
        );

        // Each round is at least 150ms of fetch plus 100ms of sleep.
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();

        let done = state.cycles_completed();
        assert!((2..=4).contains(&done), "cycles completed: {done}");
    }

    #[tokio::test]
    async fn shutdown_mid_fetch_leaves_record_untouched() {
        let state = Arc::new(WatchState::new(vec![Source::new("Jobs", "siteA/jobs")]));
        let fetcher = ScriptedFetcher::new().with_delay("Jobs", Duration::from_secs(5));
        fetcher.push("Jobs", Ok(Item::new("Role X", "siteA/jobs/1")));
        let cycle = Arc::new(PollCycle::new(
            state.clone(),
            Arc::new(fetcher),
            Arc::new(MockNotifier::new()),
        ));
        let (tx, rx) = watch::channel(false);
        let handle = spawn_scheduler(cycle, SchedulerCfg::default(), rx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop without waiting for the fetch")
            .unwrap();

        assert_eq!(state.read("Jobs").unwrap(), WatchRecord::default());
        assert_eq!(state.cycles_completed(), 0);
        assert!(state.notifications_suppressed());
    }
}
