// src/watch/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One watched page. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub name: String, // label shown to the user, e.g. "Vacancies"
    pub url: String,  // fetch locator
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// First listing item of a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub link: String,
}

impl Item {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
        }
    }
}

/// Per-source state remembered between polls.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct WatchRecord {
    pub last_item: Option<Item>,
    /// Most recent fetch attempt, successful or not.
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Result of comparing a freshly fetched item with the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Unchanged,
    ChangedFrom { previous: Item, current: Item },
    FirstObservation(Item),
}

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_first_item(&self, source: &Source) -> Result<Item, FetchError>;
    fn name(&self) -> &'static str;
}
