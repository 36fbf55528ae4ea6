//! Multi-source discovery coordination.
//!
//! The coordinator owns an ordered roster of source adapters built from
//! configuration. For each run it computes the lookback window, fans the
//! adapters out on a bounded concurrent stream, and merges their outputs in
//! roster order. One source failing is the expected steady state: the
//! failure is logged with the source name and contributes zero items, and
//! every other source proceeds untouched.
//!
//! Order note: items are concatenated in source-declaration order. Ordering
//! at this stage carries no meaning (ranking happens later); keeping it
//! deterministic just makes runs comparable.

use crate::config::Config;
use crate::models::Item;
use crate::sources::arxiv::ArxivAdapter;
use crate::sources::biorxiv::BiorxivAdapter;
use crate::sources::crossref::CrossrefAdapter;
use crate::sources::feed::FeedAdapter;
use crate::sources::pubmed::PubmedAdapter;
use crate::sources::{http_client, DateWindow, SourceAdapter};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::error::Error;
use tracing::{error, info, instrument, warn};

/// Fans discovery out over every configured source.
pub struct DiscoveryCoordinator {
    adapters: Vec<Box<dyn SourceAdapter>>,
    parallel_sources: usize,
    backfill_days: i64,
}

impl DiscoveryCoordinator {
    /// Build a coordinator from an explicit adapter roster.
    pub fn new(
        adapters: Vec<Box<dyn SourceAdapter>>,
        parallel_sources: usize,
        backfill_days: i64,
    ) -> Self {
        Self {
            adapters,
            parallel_sources: parallel_sources.max(1),
            backfill_days,
        }
    }

    /// Build the adapter roster the configuration describes: enabled API
    /// sources first, then journal feeds, then news feeds.
    pub fn from_config(config: &Config) -> Result<Self, Box<dyn Error>> {
        let client = http_client(&config.crawling)?;
        let max = config.crawling.max_per_source;
        let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();

        for api in config.research_sources.apis.iter().filter(|api| api.enabled) {
            match api.name.to_lowercase().as_str() {
                "arxiv" => adapters.push(Box::new(ArxivAdapter::new(client.clone(), max))),
                "crossref" => adapters.push(Box::new(CrossrefAdapter::new(
                    client.clone(),
                    max,
                    config.api_keys.crossref_email.clone(),
                ))),
                "pubmed" => adapters.push(Box::new(PubmedAdapter::new(client.clone(), max))),
                "biorxiv" => adapters.push(Box::new(BiorxivAdapter::new(client.clone()))),
                _ => warn!(source = %api.name, "Unknown API source; skipping"),
            }
        }

        for journal in &config.research_sources.journals {
            adapters.push(Box::new(FeedAdapter::journal(client.clone(), journal)));
        }
        for news in &config.news_sources {
            if let Some(adapter) = FeedAdapter::news(client.clone(), news) {
                adapters.push(Box::new(adapter));
            }
        }

        Ok(Self::new(
            adapters,
            config.crawling.parallel_sources,
            config.schedule.backfill_days,
        ))
    }

    /// Number of adapters that will participate in discovery.
    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    /// Discover candidate items from every source for the given topics and
    /// target date.
    ///
    /// Never fails: sources that error are logged and skipped, and an empty
    /// result means "nothing to do."
    #[instrument(level = "info", skip_all, fields(date = %date))]
    pub async fn discover_all(&self, topics: &[String], date: NaiveDate) -> Vec<Item> {
        let window = DateWindow::ending_at(date, self.backfill_days);
        info!(
            start = %window.start,
            end = %window.end,
            sources = self.adapters.len(),
            "Discovering content"
        );

        // buffered (not buffer_unordered) keeps results in roster order
        // while adapters still run concurrently.
        let results: Vec<(String, _)> = stream::iter(self.adapters.iter())
            .map(|adapter| async move {
                let name = adapter.name().to_string();
                let result = adapter.discover(topics, &window).await;
                (name, result)
            })
            .buffered(self.parallel_sources)
            .collect()
            .await;

        let mut all_items = Vec::new();
        for (name, result) in results {
            match result {
                Ok(items) => {
                    info!(source = %name, count = items.len(), "Discovered items");
                    all_items.extend(items);
                }
                Err(e) => {
                    error!(source = %name, error = %e, "Source failed; continuing without it");
                }
            }
        }

        info!(total = all_items.len(), "Discovery complete");
        all_items
    }
}
