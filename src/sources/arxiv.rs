//! arXiv preprint discovery via the export API.
//!
//! The API speaks Atom, so entries go through the shared feed parser and are
//! then reshaped: the entry id URL (`http://arxiv.org/abs/2401.01234v1`)
//! yields the prefixed native id `arXiv:2401.01234v1`, and the PDF link is
//! derived from the abstract link.
//!
//! Queries run newest-first per topic; the API has no date-range filter, so
//! the discovery window is applied downstream by recency scoring.

use super::{DateWindow, SourceAdapter, SourceResult};
use crate::models::{Item, ItemType};
use crate::sources::feed::{parse_feed, FeedEntry};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, instrument};

const API_URL: &str = "http://export.arxiv.org/api/query";
const SOURCE_NAME: &str = "arXiv";

/// Adapter for the arXiv Atom API.
pub struct ArxivAdapter {
    client: Client,
    max_results: usize,
}

impl ArxivAdapter {
    pub fn new(client: Client, max_results: usize) -> Self {
        Self {
            client,
            max_results,
        }
    }

    async fn fetch_topic(&self, topic: &str) -> SourceResult {
        let url = format!(
            "{API_URL}?search_query=all:{}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
            urlencoding::encode(topic),
            self.max_results,
        );

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let entries = parse_feed(&body)?;
        Ok(entries.into_iter().map(entry_to_item).collect())
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all)]
    async fn discover(&self, topics: &[String], _window: &DateWindow) -> SourceResult {
        let mut items = Vec::new();
        for topic in topics {
            match self.fetch_topic(topic).await {
                Ok(mut batch) => items.append(&mut batch),
                Err(e) => error!(topic = %topic, error = %e, "arXiv query failed"),
            }
        }
        Ok(items)
    }
}

/// Reshape a parsed Atom entry into an [`Item`].
fn entry_to_item(entry: FeedEntry) -> Item {
    let short_id = entry
        .id
        .as_deref()
        .filter(|id| id.contains("/abs/"))
        .and_then(|id| id.rsplit("/abs/").next())
        .unwrap_or_default();
    let id = if short_id.is_empty() {
        entry.link.clone()
    } else {
        format!("arXiv:{short_id}")
    };

    let pdf_url = if entry.link.contains("/abs/") {
        Some(format!("{}.pdf", entry.link.replace("/abs/", "/pdf/")))
    } else {
        None
    };

    Item {
        id,
        url: entry.link,
        title: entry.title,
        authors: entry.authors,
        abstract_text: entry.summary,
        published_at: entry.published.unwrap_or_default(),
        source: SOURCE_NAME.to_string(),
        kind: ItemType::Research,
        pdf_url,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_entry() -> FeedEntry {
        FeedEntry {
            id: Some("http://arxiv.org/abs/2401.01234v1".to_string()),
            title: "Deep Learning for X".to_string(),
            link: "https://arxiv.org/abs/2401.01234v1".to_string(),
            summary: "We propose a method.".to_string(),
            authors: vec!["A. Smith".to_string()],
            published: Some("2025-05-05T03:30:00Z".to_string()),
        }
    }

    #[test]
    fn test_entry_to_item_derives_prefixed_id_and_pdf() {
        let item = entry_to_item(atom_entry());
        assert_eq!(item.id, "arXiv:2401.01234v1");
        assert_eq!(item.pdf_url.as_deref(), Some("https://arxiv.org/pdf/2401.01234v1.pdf"));
        assert_eq!(item.source, "arXiv");
        assert_eq!(item.kind, ItemType::Research);
    }

    #[test]
    fn test_entry_without_abs_id_keeps_link_as_id() {
        let mut entry = atom_entry();
        entry.id = None;
        entry.link = "https://arxiv.org/something-else".to_string();

        let item = entry_to_item(entry);
        assert_eq!(item.id, "https://arxiv.org/something-else");
        assert!(item.pdf_url.is_none());
    }
}
