//! PubMed discovery via the NCBI E-utilities.
//!
//! Two-step flow: `esearch` returns matching PMIDs for a topic within the
//! publication-date window, then `esummary` resolves a bounded batch of
//! those ids into summaries. Summaries carry no abstract; that requires a
//! separate `efetch`, which is left to the external extraction stage.

use super::{DateWindow, SourceAdapter, SourceResult};
use crate::models::{Item, ItemType};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, instrument};

const BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const SOURCE_NAME: &str = "PubMed";
/// esummary batch cap.
const SUMMARY_BATCH: usize = 50;

/// Adapter for the PubMed E-utilities API.
pub struct PubmedAdapter {
    client: Client,
    max_results: usize,
}

impl PubmedAdapter {
    pub fn new(client: Client, max_results: usize) -> Self {
        Self {
            client,
            max_results,
        }
    }

    async fn fetch_topic(&self, topic: &str, window: &DateWindow) -> SourceResult {
        let ids = self.search_ids(topic, window).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_summaries(&ids).await
    }

    async fn search_ids(
        &self,
        topic: &str,
        window: &DateWindow,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
        let url = format!("{BASE_URL}/esearch.fcgi");
        let params = [
            ("db", "pubmed".to_string()),
            ("term", topic.to_string()),
            ("retmax", self.max_results.to_string()),
            ("retmode", "json".to_string()),
            ("datetype", "pdat".to_string()),
            ("mindate", window.start.format("%Y/%m/%d").to_string()),
            ("maxdate", window.end.format("%Y/%m/%d").to_string()),
            ("sort", "date".to_string()),
        ];

        let reply: EsearchReply = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(reply.esearchresult.idlist)
    }

    async fn fetch_summaries(&self, ids: &[String]) -> SourceResult {
        let url = format!("{BASE_URL}/esummary.fcgi");
        let batch = &ids[..ids.len().min(SUMMARY_BATCH)];
        let params = [
            ("db", "pubmed".to_string()),
            ("id", batch.join(",")),
            ("retmode", "json".to_string()),
        ];

        let reply: Value = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // The result object maps each PMID to its summary, plus a "uids"
        // array listing them.
        let mut items = Vec::new();
        if let Some(result) = reply.get("result").and_then(Value::as_object) {
            for (pmid, summary) in result {
                if pmid == "uids" {
                    continue;
                }
                items.push(summary_to_item(pmid, summary));
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for PubmedAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all)]
    async fn discover(&self, topics: &[String], window: &DateWindow) -> SourceResult {
        let mut items = Vec::new();
        for topic in topics {
            match self.fetch_topic(topic, window).await {
                Ok(mut batch) => items.append(&mut batch),
                Err(e) => error!(topic = %topic, error = %e, "PubMed query failed"),
            }
        }
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct EsearchReply {
    #[serde(default)]
    esearchresult: EsearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

fn summary_to_item(pmid: &str, summary: &Value) -> Item {
    let text = |key: &str| {
        summary
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let authors = summary
        .get("authors")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|author| author.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    // The elocationid field multiplexes DOIs and page identifiers, e.g.
    // "doi: 10.1016/j.cell.2024.01.001".
    let elocation = text("elocationid");
    let doi = elocation
        .to_lowercase()
        .contains("doi")
        .then(|| elocation.trim_start_matches("doi:").trim().to_string())
        .filter(|d| !d.is_empty());

    let journal = Some(text("source")).filter(|j| !j.is_empty());

    Item {
        id: format!("PMID:{pmid}"),
        url: format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
        title: text("title"),
        authors,
        published_at: text("pubdate"),
        source: SOURCE_NAME.to_string(),
        kind: ItemType::Research,
        doi,
        journal,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_to_item_maps_fields() {
        let summary = json!({
            "title": "A Biomedical Study",
            "authors": [{"name": "Curie M"}, {"name": "Meitner L"}],
            "pubdate": "2024 Mar 9",
            "source": "Cell",
            "elocationid": "doi: 10.1016/j.cell.2024.01.001"
        });

        let item = summary_to_item("12345678", &summary);
        assert_eq!(item.id, "PMID:12345678");
        assert_eq!(item.url, "https://pubmed.ncbi.nlm.nih.gov/12345678/");
        assert_eq!(item.authors, vec!["Curie M".to_string(), "Meitner L".to_string()]);
        assert_eq!(item.doi.as_deref(), Some("10.1016/j.cell.2024.01.001"));
        assert_eq!(item.journal.as_deref(), Some("Cell"));
        assert!(item.abstract_text.is_empty());
    }

    #[test]
    fn test_summary_without_doi_marker_has_no_doi() {
        let summary = json!({
            "title": "Pages Only",
            "elocationid": "e1002345"
        });

        let item = summary_to_item("1", &summary);
        assert!(item.doi.is_none());
    }

    #[test]
    fn test_summary_with_missing_fields_is_total() {
        let item = summary_to_item("2", &json!({}));
        assert_eq!(item.id, "PMID:2");
        assert!(item.title.is_empty());
        assert!(item.authors.is_empty());
        assert!(item.journal.is_none());
    }

    #[test]
    fn test_esearch_reply_parses_idlist() {
        let json = r#"{"esearchresult": {"idlist": ["1", "2", "3"]}}"#;
        let reply: EsearchReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.esearchresult.idlist.len(), 3);
    }
}
