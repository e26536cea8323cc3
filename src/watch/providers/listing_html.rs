// src/watch/providers/listing_html.rs
//! Live fetcher: downloads a listing page and extracts its first item.

use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::OnceCell;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::FetchError;
use crate::watch::types::{Item, Source, SourceFetcher};

const USER_AGENT: &str = concat!("listing-watcher/", env!("CARGO_PKG_VERSION"));

/// CSS selectors describing where the first item lives on a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingSelectors {
    pub item: String,
    pub title: String,
    pub link: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item: ".work-list-item".into(),
            title: "h3".into(),
            link: "a".into(),
        }
    }
}

struct Compiled {
    item: Selector,
    title: Selector,
    link: Selector,
}

impl Compiled {
    fn new(sel: &ListingSelectors) -> Result<Self, FetchError> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|e| FetchError::Parse(format!("invalid selector '{s}': {e:?}")))
        };
        Ok(Self {
            item: parse(&sel.item)?,
            title: parse(&sel.title)?,
            link: parse(&sel.link)?,
        })
    }
}

/// Collapse runs of whitespace and trim.
fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re.replace_all(s, " ").trim().to_string()
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<String>())
}

/// Extract the first listing item from `html`. Relative links are resolved
/// against `page_url`.
pub fn extract_first_item(
    html: &str,
    page_url: &str,
    selectors: &ListingSelectors,
) -> Result<Item, FetchError> {
    let compiled = Compiled::new(selectors)?;
    let document = Html::parse_document(html);

    let Some(item) = document.select(&compiled.item).next() else {
        return Err(FetchError::NoItem);
    };

    let title = item
        .select(&compiled.title)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FetchError::Parse(format!("item has no '{}' title", selectors.title)))?;

    let href = item
        .select(&compiled.link)
        .find_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| FetchError::Parse(format!("item has no '{}' href", selectors.link)))?;

    Ok(Item {
        title,
        link: resolve_link(page_url, href)?,
    })
}

fn resolve_link(page_url: &str, href: &str) -> Result<String, FetchError> {
    if let Ok(abs) = Url::parse(href) {
        return Ok(abs.to_string());
    }
    let base = Url::parse(page_url)
        .map_err(|e| FetchError::Parse(format!("page url '{page_url}': {e}")))?;
    base.join(href)
        .map(|u| u.to_string())
        .map_err(|e| FetchError::Parse(format!("link '{href}': {e}")))
}

/// Fetches pages over HTTP and extracts the first item.
pub struct HtmlListingFetcher {
    client: Client,
    selectors: ListingSelectors,
}

impl HtmlListingFetcher {
    pub fn new(selectors: ListingSelectors, timeout: Duration) -> Result<Self, FetchError> {
        // Fail fast on bad selectors instead of on every fetch.
        Compiled::new(&selectors)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, selectors })
    }
}

#[async_trait]
impl SourceFetcher for HtmlListingFetcher {
    async fn fetch_first_item(&self, source: &Source) -> Result<Item, FetchError> {
        let t0 = std::time::Instant::now();

        let rsp = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(t0.elapsed())
                } else {
                    FetchError::Http(format!("GET {}: {e}", source.url))
                }
            })?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = rsp
            .text()
            .await
            .map_err(|e| FetchError::Http(format!("reading {}: {e}", source.url)))?;

        let item = extract_first_item(&body, &source.url, &self.selectors);
        histogram!("watch_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        item
    }

    fn name(&self) -> &'static str {
        "listing-html"
    }
}
