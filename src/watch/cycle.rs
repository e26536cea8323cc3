// src/watch/cycle.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use tokio::sync::Mutex;

use crate::error::FetchError;
use crate::notify::{format_change_message, Notifier};
use crate::watch::state::WatchState;
use crate::watch::types::{Item, Source, SourceFetcher, UpdateOutcome};
use crate::watch::ensure_metrics_described;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// One pass over every configured source: fetch, compare, store, notify.
pub struct PollCycle {
    state: Arc<WatchState>,
    fetcher: Arc<dyn SourceFetcher>,
    notifier: Arc<dyn Notifier>,
    fetch_timeout: Duration,
    // Held for the whole pass so two passes never interleave.
    running: Mutex<()>,
}

/// What happened to a single source during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceResult {
    FetchFailed,
    Unchanged,
    Suppressed,
    Notified,
    DeliveryFailed,
}

impl PollCycle {
    pub fn new(
        state: Arc<WatchState>,
        fetcher: Arc<dyn SourceFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state,
            fetcher,
            notifier,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            running: Mutex::new(()),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn state(&self) -> &Arc<WatchState> {
        &self.state
    }

    /// Run one pass and return how many notifications were delivered.
    ///
    /// A first observation made while the startup window is open is stored
    /// silently. The window closes once the pass is over, whatever happened
    /// to the individual sources.
    pub async fn run_once(&self) -> usize {
        ensure_metrics_described();
        let _pass = self.running.lock().await;
        let t0 = std::time::Instant::now();

        let suppressed = self.state.notifications_suppressed();
        let mut sent = 0usize;
        let mut failed = 0usize;

        let sources: Vec<Source> = self.state.sources().cloned().collect();
        for source in &sources {
            match self.check_source(source, suppressed).await {
                SourceResult::Notified => sent += 1,
                SourceResult::FetchFailed => failed += 1,
                _ => {}
            }
        }

        self.state.finish_cycle();

        counter!("watch_cycles_total").increment(1);
        gauge!("watch_last_cycle_ts").set(Utc::now().timestamp() as f64);
        histogram!("watch_cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        tracing::info!(
            target: "watch",
            sources = sources.len(),
            notified = sent,
            fetch_failures = failed,
            suppressed,
            "poll cycle finished"
        );
        sent
    }

    async fn check_source(&self, source: &Source, suppressed: bool) -> SourceResult {
        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.fetcher.fetch_first_item(source),
        )
        .await
        .unwrap_or(Err(FetchError::Timeout(self.fetch_timeout)));
        let now = Utc::now();

        let item = match fetched {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(error = %e, source = %source.name, fetcher = self.fetcher.name(), "fetch failed");
                counter!("watch_fetch_errors_total").increment(1);
                if let Err(e) = self.state.mark_checked(&source.name, now) {
                    tracing::error!(error = %e, "mark_checked on configured source");
                }
                return SourceResult::FetchFailed;
            }
        };

        let outcome = match self.state.compare_and_update(&source.name, item, now) {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %e, "compare_and_update on configured source");
                return SourceResult::FetchFailed;
            }
        };

        match outcome {
            UpdateOutcome::Unchanged => {
                tracing::trace!(source = %source.name, "no change");
                SourceResult::Unchanged
            }
            UpdateOutcome::FirstObservation(item) if suppressed => {
                tracing::debug!(source = %source.name, link = %item.link, "initial item stored silently");
                counter!("watch_suppressed_total").increment(1);
                SourceResult::Suppressed
            }
            UpdateOutcome::FirstObservation(item) => {
                counter!("watch_changes_total").increment(1);
                self.deliver(source, &item).await
            }
            UpdateOutcome::ChangedFrom { previous, current } => {
                tracing::info!(
                    source = %source.name,
                    from = %previous.link,
                    to = %current.link,
                    "new item detected"
                );
                counter!("watch_changes_total").increment(1);
                self.deliver(source, &current).await
            }
        }
    }

    /// State already holds `item`; a failed send is logged and not retried.
    async fn deliver(&self, source: &Source, item: &Item) -> SourceResult {
        let text = format_change_message(&source.name, item);
        match self.notifier.send(&text).await {
            Ok(()) => {
                counter!("watch_notifications_total").increment(1);
                tracing::info!(source = %source.name, channel = self.notifier.name(), "notification sent");
                SourceResult::Notified
            }
            Err(e) => {
                counter!("watch_delivery_errors_total").increment(1);
                tracing::warn!(error = %e, source = %source.name, channel = self.notifier.name(), "notification failed");
                SourceResult::DeliveryFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;
    use crate::watch::providers::scripted::ScriptedFetcher;

    fn setup(
        fetcher: ScriptedFetcher,
        notifier: Arc<MockNotifier>,
    ) -> PollCycle {
        let state = Arc::new(WatchState::new(vec![
            Source::new("Jobs", "siteA/jobs"),
            Source::new("Tasks", "siteA/tasks"),
        ]));
        PollCycle::new(state, Arc::new(fetcher), notifier)
    }

    #[tokio::test]
    async fn first_cycle_is_silent_even_with_data() {
        let f = ScriptedFetcher::new();
        f.push("Jobs", Ok(Item::new("Role X", "siteA/jobs/1")));
        f.push("Tasks", Ok(Item::new("Task A", "siteA/tasks/1")));
        let n = Arc::new(MockNotifier::new());
        let cycle = setup(f, n.clone());

        assert_eq!(cycle.run_once().await, 0);
        assert!(n.messages().is_empty());
        assert!(!cycle.state().notifications_suppressed());
    }

    #[tokio::test]
    async fn first_observation_after_startup_window_is_announced() {
        let f = ScriptedFetcher::new();
        f.push("Jobs", Err(FetchError::NoItem));
        f.push("Tasks", Err(FetchError::NoItem));
        f.push("Jobs", Ok(Item::new("Role X", "siteA/jobs/1")));
        let n = Arc::new(MockNotifier::new());
        let cycle = setup(f, n.clone());

        assert_eq!(cycle.run_once().await, 0);
        assert_eq!(cycle.run_once().await, 1);
        assert_eq!(n.messages(), vec!["🆕 New in Jobs:\nRole X\nsiteA/jobs/1".to_string()]);
    }

    #[tokio::test]
    async fn hung_fetch_times_out_and_counts_as_failure() {
        let f = ScriptedFetcher::new().with_delay("Jobs", Duration::from_millis(200));
        f.push("Jobs", Ok(Item::new("Role X", "siteA/jobs/1")));
        f.push("Tasks", Ok(Item::new("Task A", "siteA/tasks/1")));
        let n = Arc::new(MockNotifier::new());
        let cycle = setup(f, n).with_fetch_timeout(Duration::from_millis(20));

        cycle.run_once().await;
        let jobs = cycle.state().read("Jobs").unwrap();
        assert!(jobs.last_item.is_none());
        assert!(jobs.last_checked_at.is_some());
        assert!(cycle.state().read("Tasks").unwrap().last_item.is_some());
    }

    #[tokio::test]
    async fn failed_delivery_keeps_new_state_and_is_not_repeated() {
        let f = ScriptedFetcher::new();
        f.push("Jobs", Ok(Item::new("Role X", "siteA/jobs/1")));
        f.push("Jobs", Ok(Item::new("Role Y", "siteA/jobs/2")));
        f.push("Jobs", Ok(Item::new("Role Y", "siteA/jobs/2")));
        let n = Arc::new(MockNotifier::failing());
        let cycle = setup(f, n.clone());

        cycle.run_once().await;
        assert_eq!(cycle.run_once().await, 0);
        assert_eq!(
            cycle.state().read("Jobs").unwrap().last_item.unwrap().link,
            "siteA/jobs/2"
        );
        cycle.run_once().await;
        // One attempt for the change, nothing more once the link is stable.
        assert_eq!(n.messages().len(), 1);
    }
}
