// src/config/watch.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watch::providers::listing_html::ListingSelectors;
use crate::watch::types::Source;

pub const ENV_CONFIG_PATH: &str = "WATCH_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/watch.toml";
pub const DEFAULT_JSON_PATH: &str = "config/watch.json";

fn default_poll_interval_secs() -> u64 {
    300
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_sources() -> Vec<Source> {
    vec![
        Source::new("Vacancies", "https://3ddd.ru/work/vacancies"),
        Source::new("Tasks", "https://3ddd.ru/work/tasks"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Watched pages, in display order.
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
    /// Chat the notifications go to (Telegram chat id).
    #[serde(default)]
    pub notification_target: Option<String>,
    /// Send a one-off "started" message before the first cycle.
    #[serde(default = "default_true")]
    pub announce_startup: bool,
    #[serde(default)]
    pub extract: ListingSelectors,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            sources: default_sources(),
            notification_target: None,
            announce_startup: true,
            extract: ListingSelectors::default(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading watch config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing watch config {}", path.display()))?;
        cfg.validated()
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $WATCH_CONFIG_PATH
    /// 2) config/watch.toml
    /// 3) config/watch.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_TOML_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_TOML_PATH))?
        } else if Path::new(DEFAULT_JSON_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_JSON_PATH))?
        } else {
            Self::default()
        };
        cfg.with_env_overrides()?.validated()
    }

    /// CHECK_INTERVAL_SECS, FETCH_TIMEOUT_SECS, TELEGRAM_CHAT_ID / CHAT_ID.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_u64("CHECK_INTERVAL_SECS")? {
            self.poll_interval_secs = v;
        }
        if let Some(v) = env_u64("FETCH_TIMEOUT_SECS")? {
            self.fetch_timeout_secs = v;
        }
        let chat = std::env::var("TELEGRAM_CHAT_ID")
            .or_else(|_| std::env::var("CHAT_ID"))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if chat.is_some() {
            self.notification_target = chat;
        }
        Ok(self)
    }

    fn validated(mut self) -> Result<Self> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be > 0");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be > 0");
        }
        for s in &mut self.sources {
            s.name = s.name.trim().to_string();
            s.url = s.url.trim().to_string();
        }
        if self.sources.is_empty() {
            bail!("at least one source must be configured");
        }
        {
            let mut seen = HashSet::new();
            for s in &self.sources {
                if s.name.is_empty() || s.url.is_empty() {
                    bail!("source entries need a non-empty name and url");
                }
                if !seen.insert(s.name.as_str()) {
                    bail!("duplicate source name '{}'", s.name);
                }
            }
        }
        Ok(self)
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{key} must be a positive integer, got '{v}'")),
        _ => Ok(None),
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatchConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    if hint_ext == "toml" {
        return Ok(toml::from_str(s)?);
    }
    // Unknown extension: JSON if it looks like an object, TOML otherwise.
    if s.trim_start().starts_with('{') {
        Ok(serde_json::from_str(s)?)
    } else {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const TOML: &str = r#"
poll_interval_secs = 60
notification_target = "-100123"

[[sources]]
name = " Jobs "
url = "https://site.test/jobs"

[[sources]]
name = "Tasks"
url = "https://site.test/tasks"

[extract]
item = ".row"
"#;

    #[test]
    fn toml_fills_defaults() {
        let cfg = parse_config(TOML, "toml").unwrap().validated().unwrap();
        assert_eq!(cfg.poll_interval_secs, 60);
        assert_eq!(cfg.fetch_timeout_secs, 10);
        assert_eq!(cfg.sources[0].name, "Jobs");
        assert_eq!(cfg.notification_target.as_deref(), Some("-100123"));
        assert_eq!(cfg.extract.item, ".row");
        assert_eq!(cfg.extract.title, "h3");
        assert!(cfg.announce_startup);
    }

    #[test]
    fn json_without_extension_hint() {
        let json = r#"{"sources":[{"name":"A","url":"https://a.test"}],"announce_startup":false}"#;
        let cfg = parse_config(json, "").unwrap().validated().unwrap();
        assert_eq!(cfg.poll_interval_secs, 300);
        assert!(!cfg.announce_startup);
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        let dup = WatchConfig {
            sources: vec![Source::new("A", "https://a"), Source::new("A ", "https://b")],
            ..WatchConfig::default()
        };
        assert!(dup.validated().is_err());

        let none = WatchConfig {
            sources: vec![],
            ..WatchConfig::default()
        };
        assert!(none.validated().is_err());

        let zero = WatchConfig {
            poll_interval_secs: 0,
            ..WatchConfig::default()
        };
        assert!(zero.validated().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply() {
        env::set_var("CHECK_INTERVAL_SECS", "42");
        env::remove_var("TELEGRAM_CHAT_ID");
        env::set_var("CHAT_ID", "777");
        let cfg = WatchConfig::default().with_env_overrides().unwrap();
        assert_eq!(cfg.poll_interval_secs, 42);
        assert_eq!(cfg.notification_target.as_deref(), Some("777"));

        env::set_var("CHECK_INTERVAL_SECS", "soon");
        assert!(WatchConfig::default().with_env_overrides().is_err());

        env::remove_var("CHECK_INTERVAL_SECS");
        env::remove_var("CHAT_ID");
    }
}
