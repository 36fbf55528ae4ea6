//! bioRxiv preprint discovery.
//!
//! The details API returns everything posted in a date window, with no
//! server-side topic search, so relevance filtering happens here: an item
//! survives only if some topic appears in its title or abstract.

use super::{DateWindow, SourceAdapter, SourceResult};
use crate::models::{Item, ItemType};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

const BASE_URL: &str = "https://api.biorxiv.org/details/biorxiv";
const SOURCE_NAME: &str = "bioRxiv";

/// Adapter for the bioRxiv details API.
pub struct BiorxivAdapter {
    client: Client,
}

impl BiorxivAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAdapter for BiorxivAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all)]
    async fn discover(&self, topics: &[String], window: &DateWindow) -> SourceResult {
        let url = format!("{BASE_URL}/{}/{}", window.start, window.end);

        let reply: BiorxivReply = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let items = reply
            .collection
            .into_iter()
            .filter(|paper| matches_topics(paper, topics))
            .map(paper_to_item)
            .collect();
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct BiorxivReply {
    #[serde(default)]
    collection: Vec<BiorxivPaper>,
}

#[derive(Debug, Deserialize)]
struct BiorxivPaper {
    #[serde(default)]
    doi: String,
    #[serde(default)]
    title: String,
    /// Semicolon-separated author list.
    #[serde(default)]
    authors: String,
    #[serde(rename = "abstract", default)]
    abstract_text: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    version: Option<String>,
}

/// Client-side topic filter over title+abstract.
fn matches_topics(paper: &BiorxivPaper, topics: &[String]) -> bool {
    let haystack = format!("{} {}", paper.title, paper.abstract_text).to_lowercase();
    topics
        .iter()
        .any(|topic| haystack.contains(&topic.to_lowercase()))
}

fn paper_to_item(paper: BiorxivPaper) -> Item {
    let version = paper.version.as_deref().unwrap_or("1");
    let url = format!("https://www.biorxiv.org/content/{}v{version}", paper.doi);

    let authors = paper
        .authors
        .split(';')
        .map(|author| author.trim().to_string())
        .filter(|author| !author.is_empty())
        .collect();

    Item {
        id: paper.doi.clone(),
        url,
        title: paper.title,
        authors,
        abstract_text: paper.abstract_text,
        published_at: paper.date,
        source: SOURCE_NAME.to_string(),
        kind: ItemType::Research,
        doi: (!paper.doi.is_empty()).then_some(paper.doi),
        ..Default::default()
    }
}
