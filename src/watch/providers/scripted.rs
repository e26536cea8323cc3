// src/watch/providers/scripted.rs
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::watch::types::{Item, Source, SourceFetcher};

/// Fetcher that replays queued results per source name.
/// An exhausted queue answers `FetchError::NoItem`.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<String, VecDeque<Result<Item, FetchError>>>>,
    delays: HashMap<String, Duration>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch of `source` by `delay` (simulates a hung page).
    pub fn with_delay(mut self, source: &str, delay: Duration) -> Self {
        self.delays.insert(source.to_string(), delay);
        self
    }

    pub fn push(&self, source: &str, result: Result<Item, FetchError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(source.to_string())
            .or_default()
            .push_back(result);
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch_first_item(&self, source: &Source) -> Result<Item, FetchError> {
        if let Some(delay) = self.delays.get(&source.name) {
            tokio::time::sleep(*delay).await;
        }
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&source.name)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(FetchError::NoItem))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
