//! Crossref works discovery.
//!
//! Crossref indexes published, DOI-bearing literature and supports a real
//! date-window filter, so this is the one adapter that passes the discovery
//! window upstream. Requests include a `mailto` when configured, which
//! routes them into Crossref's polite pool.

use super::{DateWindow, SourceAdapter, SourceResult};
use crate::models::{Item, ItemType};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, instrument};

const API_URL: &str = "https://api.crossref.org/works";
const SOURCE_NAME: &str = "Crossref";
/// Crossref rejects `rows` above 100 on this route.
const MAX_ROWS: usize = 100;

/// Adapter for the Crossref REST API.
pub struct CrossrefAdapter {
    client: Client,
    max_results: usize,
    mailto: Option<String>,
}

impl CrossrefAdapter {
    pub fn new(client: Client, max_results: usize, mailto: Option<String>) -> Self {
        Self {
            client,
            max_results,
            mailto,
        }
    }

    async fn fetch_topic(&self, topic: &str, window: &DateWindow) -> SourceResult {
        let rows = self.max_results.min(MAX_ROWS);
        let filter = format!(
            "from-pub-date:{},until-pub-date:{}",
            window.start, window.end
        );

        let mut params = vec![
            ("query", topic.to_string()),
            ("filter", filter),
            ("rows", rows.to_string()),
            ("sort", "published".to_string()),
            ("order", "desc".to_string()),
        ];
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.clone()));
        }

        let reply: CrossrefReply = self
            .client
            .get(API_URL)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(reply.message.items.into_iter().map(work_to_item).collect())
    }
}

#[async_trait]
impl SourceAdapter for CrossrefAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all)]
    async fn discover(&self, topics: &[String], window: &DateWindow) -> SourceResult {
        let mut items = Vec::new();
        for topic in topics {
            match self.fetch_topic(topic, window).await {
                Ok(mut batch) => items.append(&mut batch),
                Err(e) => error!(topic = %topic, error = %e, "Crossref query failed"),
            }
        }
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct CrossrefReply {
    #[serde(default)]
    message: CrossrefMessage,
}

#[derive(Debug, Default, Deserialize)]
struct CrossrefMessage {
    #[serde(default)]
    items: Vec<CrossrefWork>,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI", default)]
    doi: String,
    #[serde(rename = "URL", default)]
    url: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CrossrefAuthor>,
    #[serde(rename = "abstract", default)]
    abstract_text: String,
    #[serde(default)]
    published: Option<CrossrefDate>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    #[serde(default)]
    given: String,
    #[serde(default)]
    family: String,
}

/// Crossref encodes dates as nested `date-parts` arrays, possibly partial
/// and possibly null-padded.
#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

fn work_to_item(work: CrossrefWork) -> Item {
    let url = work
        .url
        .clone()
        .unwrap_or_else(|| format!("https://doi.org/{}", work.doi));

    let authors = work
        .author
        .iter()
        .map(|author| format!("{} {}", author.given, author.family).trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    Item {
        id: work.doi.clone(),
        url,
        title: work.title.into_iter().next().unwrap_or_default(),
        authors,
        abstract_text: work.abstract_text,
        published_at: collapse_date_parts(work.published.as_ref()),
        source: SOURCE_NAME.to_string(),
        kind: ItemType::Research,
        doi: (!work.doi.is_empty()).then_some(work.doi),
        journal: work.container_title.into_iter().next().filter(|j| !j.is_empty()),
        ..Default::default()
    }
}

/// Collapse `date-parts` to `YYYY-MM-DD`, padding missing month/day with 01.
/// Anything unusable collapses to an empty string.
fn collapse_date_parts(date: Option<&CrossrefDate>) -> String {
    let Some(parts) = date.and_then(|d| d.date_parts.first()) else {
        return String::new();
    };

    let mut known = Vec::new();
    for part in parts {
        match part {
            Some(value) => known.push(*value),
            None => break,
        }
    }

    match known.as_slice() {
        [year, month, day, ..] => format!("{year:04}-{month:02}-{day:02}"),
        [year, month] => format!("{year:04}-{month:02}-01"),
        [year] => format!("{year:04}-01-01"),
        [] => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(parts: Vec<Vec<Option<i64>>>) -> CrossrefDate {
        CrossrefDate { date_parts: parts }
    }

    #[test]
    fn test_collapse_full_date() {
        let d = date(vec![vec![Some(2024), Some(3), Some(9)]]);
        assert_eq!(collapse_date_parts(Some(&d)), "2024-03-09");
    }

    #[test]
    fn test_collapse_partial_dates_pad_with_january_first() {
        let ym = date(vec![vec![Some(2024), Some(3)]]);
        assert_eq!(collapse_date_parts(Some(&ym)), "2024-03-01");

        let y = date(vec![vec![Some(2024)]]);
        assert_eq!(collapse_date_parts(Some(&y)), "2024-01-01");
    }

    #[test]
    fn test_collapse_null_padded_and_missing_dates() {
        let nulls = date(vec![vec![Some(2024), None, Some(9)]]);
        assert_eq!(collapse_date_parts(Some(&nulls)), "2024-01-01");

        let empty = date(vec![vec![]]);
        assert_eq!(collapse_date_parts(Some(&empty)), "");
        assert_eq!(collapse_date_parts(None), "");
    }

    #[test]
    fn test_work_to_item_maps_fields() {
        let json = r#"{
            "DOI": "10.1038/s41586-024-00001-1",
            "URL": "https://doi.org/10.1038/s41586-024-00001-1",
            "title": ["A Notable Result"],
            "author": [
                {"given": "Ada", "family": "Lovelace"},
                {"given": "", "family": ""}
            ],
            "abstract": "We report a result.",
            "published": {"date-parts": [[2024, 3, 9]]},
            "container-title": ["Nature"]
        }"#;
        let work: CrossrefWork = serde_json::from_str(json).unwrap();

        let item = work_to_item(work);
        assert_eq!(item.id, "10.1038/s41586-024-00001-1");
        assert_eq!(item.doi.as_deref(), Some("10.1038/s41586-024-00001-1"));
        assert_eq!(item.authors, vec!["Ada Lovelace".to_string()]);
        assert_eq!(item.published_at, "2024-03-09");
        assert_eq!(item.journal.as_deref(), Some("Nature"));
        assert_eq!(item.kind, ItemType::Research);
    }

    #[test]
    fn test_work_without_url_builds_doi_link() {
        let json = r#"{"DOI": "10.1/x", "title": ["T"]}"#;
        let work: CrossrefWork = serde_json::from_str(json).unwrap();

        let item = work_to_item(work);
        assert_eq!(item.url, "https://doi.org/10.1/x");
    }
}
