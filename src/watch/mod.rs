// src/watch/mod.rs
//! Change-detection engine: state store, poll cycle, scheduler and the
//! read-only query views.

pub mod cycle;
pub mod providers;
pub mod query;
pub mod scheduler;
pub mod state;
pub mod types;

pub use cycle::PollCycle;
pub use state::WatchState;
pub use types::{Item, Source, SourceFetcher, UpdateOutcome, WatchRecord};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_cycles_total", "Completed poll cycles.");
        describe_counter!(
            "watch_fetch_errors_total",
            "Source fetches that failed, timed out or found no item."
        );
        describe_counter!(
            "watch_changes_total",
            "New first items detected outside the startup window."
        );
        describe_counter!(
            "watch_suppressed_total",
            "Initial items stored silently during the startup window."
        );
        describe_counter!("watch_notifications_total", "Notifications delivered.");
        describe_counter!(
            "watch_delivery_errors_total",
            "Notifications the channel did not accept."
        );
        describe_histogram!("watch_cycle_ms", "Poll cycle duration in milliseconds.");
        describe_histogram!("watch_fetch_ms", "Page fetch + parse time in milliseconds.");
        describe_gauge!("watch_last_cycle_ts", "Unix ts when the last poll cycle finished.");
    });
}
