//! # Watch State
//! In-memory "last seen" store for every configured source, plus the
//! startup suppression flag.
//!
//! The set of sources is fixed at construction, so the map itself is never
//! mutated; each record sits behind its own `RwLock`. Every mutation is a
//! single synchronous critical section on exactly one record (no `.await`
//! while a guard is held), so readers only ever see a whole record and a
//! cancelled task can never leave a half-written one behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::error::StateError;
use crate::watch::types::{Item, Source, UpdateOutcome, WatchRecord};

#[derive(Debug)]
struct Entry {
    source: Source,
    record: RwLock<WatchRecord>,
}

/// Engine state shared between the poll cycle (sole writer) and the query
/// handlers (readers).
#[derive(Debug)]
pub struct WatchState {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    /// True only until the first poll cycle has completed.
    suppress_notifications: AtomicBool,
    cycles_completed: AtomicU64,
    started_at: DateTime<Utc>,
}

impl WatchState {
    /// Create an empty state for `sources`: no items, never checked,
    /// notifications suppressed. Duplicate names keep the first occurrence.
    pub fn new(sources: Vec<Source>) -> Self {
        let mut entries = Vec::with_capacity(sources.len());
        let mut index = HashMap::with_capacity(sources.len());
        for source in sources {
            if index.contains_key(&source.name) {
                tracing::warn!(source = %source.name, "duplicate source name ignored");
                continue;
            }
            index.insert(source.name.clone(), entries.len());
            entries.push(Entry {
                source,
                record: RwLock::new(WatchRecord::default()),
            });
        }
        Self {
            entries,
            index,
            suppress_notifications: AtomicBool::new(true),
            cycles_completed: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Configured sources, in configuration order.
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.entries.iter().map(|e| &e.source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the record for `source`.
    pub fn read(&self, source: &str) -> Result<WatchRecord, StateError> {
        let entry = self.entry(source)?;
        let guard = entry.record.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    /// Copies of all records, in configuration order. Each record is
    /// internally consistent; there is no cross-source snapshot.
    pub fn snapshot(&self) -> Vec<(Source, WatchRecord)> {
        self.entries
            .iter()
            .map(|e| {
                let guard = e.record.read().unwrap_or_else(PoisonError::into_inner);
                (e.source.clone(), guard.clone())
            })
            .collect()
    }

    /// Compare `item` with the stored one and store it if it is new.
    ///
    /// The check time is set in the same critical section. A link equal to
    /// the stored one leaves the stored item untouched.
    pub fn compare_and_update(
        &self,
        source: &str,
        item: Item,
        checked_at: DateTime<Utc>,
    ) -> Result<UpdateOutcome, StateError> {
        let entry = self.entry(source)?;
        let mut rec = entry.record.write().unwrap_or_else(PoisonError::into_inner);
        rec.last_checked_at = Some(checked_at);

        let outcome = match rec.last_item.take() {
            None => {
                rec.last_item = Some(item.clone());
                UpdateOutcome::FirstObservation(item)
            }
            Some(previous) if previous.link == item.link => {
                rec.last_item = Some(previous);
                UpdateOutcome::Unchanged
            }
            Some(previous) => {
                rec.last_item = Some(item.clone());
                UpdateOutcome::ChangedFrom {
                    previous,
                    current: item,
                }
            }
        };
        Ok(outcome)
    }

    /// Record a fetch attempt that produced no item. Never touches `last_item`.
    pub fn mark_checked(&self, source: &str, checked_at: DateTime<Utc>) -> Result<(), StateError> {
        let entry = self.entry(source)?;
        let mut rec = entry.record.write().unwrap_or_else(PoisonError::into_inner);
        rec.last_checked_at = Some(checked_at);
        Ok(())
    }

    pub fn notifications_suppressed(&self) -> bool {
        self.suppress_notifications.load(Ordering::Acquire)
    }

    /// Close the startup suppression window and count the cycle.
    /// The flag only ever goes from true to false.
    pub(crate) fn finish_cycle(&self) {
        self.suppress_notifications.store(false, Ordering::Release);
        self.cycles_completed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Acquire)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn entry(&self, source: &str) -> Result<&Entry, StateError> {
        self.index
            .get(source)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| StateError::UnknownSource(source.to_string()))
    }
}
