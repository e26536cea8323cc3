// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod watch;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::app::Watcher;
pub use crate::config::WatchConfig;
pub use crate::error::{DeliveryError, FetchError, StateError};
pub use crate::notify::Notifier;
pub use crate::watch::{Item, PollCycle, Source, SourceFetcher, UpdateOutcome, WatchRecord, WatchState};
