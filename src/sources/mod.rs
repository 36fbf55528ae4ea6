//! Source adapters translating external APIs and feeds into [`Item`]s.
//!
//! Each adapter covers one upstream and is the unit of failure isolation:
//! an adapter that errors contributes zero items, and the coordinator moves
//! on to the next one.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | arXiv | [`arxiv`] | Atom API | One query per topic, newest first |
//! | Crossref | [`crossref`] | JSON API | Date-window filter, polite-pool mailto |
//! | PubMed | [`pubmed`] | esearch + esummary | Abstracts need a separate fetch |
//! | bioRxiv | [`biorxiv`] | JSON API | Window fetch, client-side topic filter |
//! | Journal/news feeds | [`feed`] | RSS 2.0 / Atom | Also Google-News-style search URLs |
//!
//! # Common Patterns
//!
//! Adapters share one preconfigured [`reqwest::Client`]. Per-topic request
//! failures inside an adapter are logged and skipped so one bad query does
//! not void the adapter's remaining topics.

pub mod arxiv;
pub mod biorxiv;
pub mod crossref;
pub mod feed;
pub mod pubmed;

use crate::config::CrawlingConfig;
use crate::models::Item;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::error::Error;

/// Items produced by one adapter invocation, or the reason it failed.
pub type SourceResult = Result<Vec<Item>, Box<dyn Error + Send + Sync>>;

/// Inclusive lookback window for one discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window covering `backfill_days` days up to and including `end`.
    pub fn ending_at(end: NaiveDate, backfill_days: i64) -> Self {
        Self {
            start: end - Duration::days(backfill_days),
            end,
        }
    }
}

/// One external source of candidate items.
///
/// Implementations must be self-contained: an error return means "this
/// source produced nothing this run" and must not poison any shared state.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Display name used in logs and as the items' `source` field.
    fn name(&self) -> &str;

    /// Discover candidate items for the given topics and window.
    async fn discover(&self, topics: &[String], window: &DateWindow) -> SourceResult;
}

/// Shared HTTP client carrying the configured user agent and timeout.
pub fn http_client(crawling: &CrawlingConfig) -> Result<reqwest::Client, Box<dyn Error>> {
    let client = reqwest::Client::builder()
        .user_agent(crawling.user_agent.clone())
        .timeout(std::time::Duration::from_secs(crawling.request_timeout_secs))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_spans_backfill_days() {
        let end = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        let window = DateWindow::ending_at(end, 2);
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2025, 5, 4).unwrap());
        assert_eq!(window.end, end);
    }

    #[test]
    fn test_zero_backfill_is_a_single_day() {
        let end = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        let window = DateWindow::ending_at(end, 0);
        assert_eq!(window.start, window.end);
    }
}
