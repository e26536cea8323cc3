// src/watch/query.rs
//! Read-only views over [`WatchState`] for the command and HTTP surfaces.
//! Nothing here fetches or mutates.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::watch::state::WatchState;
use crate::watch::types::Item;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceStatus {
    pub source: String,
    /// `None` means never checked.
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusReport {
    pub running: bool,
    pub started_at: DateTime<Utc>,
    pub cycles_completed: u64,
    pub notifications_suppressed: bool,
    pub sources: Vec<SourceStatus>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceLatest {
    pub source: String,
    /// `None` means no data yet.
    pub item: Option<Item>,
}

pub fn status(state: &WatchState) -> StatusReport {
    let sources = state
        .snapshot()
        .into_iter()
        .map(|(src, rec)| SourceStatus {
            source: src.name,
            last_checked_at: rec.last_checked_at,
        })
        .collect();
    StatusReport {
        running: true,
        started_at: state.started_at(),
        cycles_completed: state.cycles_completed(),
        notifications_suppressed: state.notifications_suppressed(),
        sources,
    }
}

pub fn latest(state: &WatchState) -> Vec<SourceLatest> {
    state
        .snapshot()
        .into_iter()
        .map(|(src, rec)| SourceLatest {
            source: src.name,
            item: rec.last_item,
        })
        .collect()
}

pub fn render_status(report: &StatusReport) -> String {
    let mut out = format!(
        "✅ Running since {} ({} cycles)",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.cycles_completed
    );
    for s in &report.sources {
        let when = s
            .last_checked_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never checked".to_string());
        out.push_str(&format!("\n{}: {}", s.source, when));
    }
    out
}

pub fn render_latest(rows: &[SourceLatest]) -> String {
    rows.iter()
        .map(|r| match &r.item {
            Some(item) => format!("{}:\n{}\n{}", r.source, item.title, item.link),
            None => format!("{}: no data yet", r.source),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
