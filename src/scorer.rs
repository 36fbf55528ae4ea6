//! Multi-factor scoring and ranking of candidate items.
//!
//! Each item receives four independent sub-scores, every one normalized to
//! [0,1] before weighting:
//!
//! - **Relevance**: semantic similarity to the configured topics when an
//!   embedding provider is available, keyword containment otherwise
//! - **Recency**: linear decay over a 30-day horizon
//! - **Credibility**: static publisher-reputation table, first match wins
//! - **Novelty**: preprint / published / news classification
//!
//! The weighted total and the per-factor breakdown are attached to the item,
//! and the batch is sorted descending by total. The sort is stable, so items
//! with equal totals keep their input order.
//!
//! Embedding capability is decided once per run: topic embeddings are
//! computed up front, and if none can be obtained (no provider, or the
//! provider is down) the whole run uses the keyword fallback. A per-item
//! embedding failure degrades only that item to a default relevance.

use crate::embedding::{EmbedAsync, NoEmbedder};
use crate::models::{Item, ScoreBreakdown};
use crate::utils::parse_published_at;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::cmp::Ordering;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Relevance assigned when an embedding lookup fails for one item.
const DEFAULT_RELEVANCE: f64 = 0.5;
/// Recency assigned when `published_at` is absent or unparseable.
const DEFAULT_RECENCY: f64 = 0.5;
/// Days over which recency decays before hitting the floor.
const RECENCY_HORIZON_DAYS: f64 = 30.0;
/// Recency for anything older than the horizon.
const RECENCY_FLOOR: f64 = 0.3;
/// Credibility for otherwise-unknown publishers that carry a DOI.
const DOI_CREDIBILITY: f64 = 0.75;
/// Credibility floor for unknown publishers without a DOI.
const CREDIBILITY_FLOOR: f64 = 0.60;
/// Upper bound on characters submitted to the embedding provider.
const EMBED_TEXT_LIMIT: usize = 8000;

/// Publisher credibility weights, evaluated strictly in order with the first
/// case-insensitive substring match winning. A source matching several
/// entries resolves by position in this table.
static CREDIBILITY_TABLE: Lazy<Vec<(&'static str, f64)>> = Lazy::new(|| {
    vec![
        ("arxiv", 0.85),
        ("pubmed", 0.90),
        ("nature", 0.95),
        ("science", 0.95),
        ("cell", 0.90),
        ("lancet", 0.90),
        ("mit technology review", 0.85),
        ("ars technica", 0.75),
        ("the verge", 0.70),
    ]
});

/// Source-name markers identifying preprint servers.
const PREPRINT_MARKERS: [&str; 3] = ["arxiv", "biorxiv", "medrxiv"];

/// Weights combining the four sub-scores into a total.
///
/// By convention the weights sum to 1 so totals stay within [0,1]; this is
/// not enforced beyond non-negativity at config validation.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub relevance: f64,
    pub recency: f64,
    pub credibility: f64,
    pub novelty: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            relevance: 0.35,
            recency: 0.25,
            credibility: 0.20,
            novelty: 0.20,
        }
    }
}

/// Scores and ranks a batch of items against a topic list.
pub struct Scorer<E> {
    weights: ScoreWeights,
    embedder: Option<E>,
    embed_timeout: Duration,
}

impl Scorer<NoEmbedder> {
    /// Build a scorer that always uses keyword relevance.
    pub fn without_embeddings(weights: ScoreWeights) -> Self {
        Self {
            weights,
            embedder: None,
            embed_timeout: Duration::ZERO,
        }
    }
}

impl<E> Scorer<E>
where
    E: EmbedAsync,
{
    /// Build a scorer backed by an embedding provider.
    ///
    /// `embed_timeout` bounds every individual lookup; a lookup that blows
    /// the bound degrades that item to the default relevance.
    pub fn new(weights: ScoreWeights, embedder: E, embed_timeout: Duration) -> Self {
        Self {
            weights,
            embedder: Some(embedder),
            embed_timeout,
        }
    }

    /// Score every item and return the batch sorted descending by total.
    #[instrument(level = "info", skip_all, fields(items = items.len(), topics = topics.len()))]
    pub async fn score_and_rank(&self, mut items: Vec<Item>, topics: &[String]) -> Vec<Item> {
        let topic_embeddings = self.topic_embeddings(topics).await;
        let now = Utc::now();

        for item in items.iter_mut() {
            let relevance = match &self.embedder {
                Some(embedder) if !topic_embeddings.is_empty() => {
                    self.semantic_relevance(embedder, item, &topic_embeddings).await
                }
                _ => keyword_relevance(item, topics),
            };

            let breakdown = ScoreBreakdown {
                relevance,
                recency: recency_score(&item.published_at, now),
                credibility: credibility_score(item),
                novelty: novelty_score(item),
            };

            let w = &self.weights;
            let total = breakdown.relevance * w.relevance
                + breakdown.recency * w.recency
                + breakdown.credibility * w.credibility
                + breakdown.novelty * w.novelty;

            item.score = Some(total);
            item.score_breakdown = Some(breakdown);
        }

        // Stable sort: equal totals keep their input order.
        items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        if let Some(top) = items.first().and_then(|item| item.score) {
            info!(top_score = %format!("{top:.3}"), "Scoring complete");
        }
        items
    }

    /// Embed each topic once. Empty result means semantic scoring is
    /// unavailable for this run.
    async fn topic_embeddings(&self, topics: &[String]) -> Vec<Vec<f32>> {
        let Some(embedder) = &self.embedder else {
            return Vec::new();
        };

        let mut embeddings = Vec::with_capacity(topics.len());
        for topic in topics {
            match tokio::time::timeout(self.embed_timeout, embedder.embed(topic)).await {
                Ok(Ok(vector)) => embeddings.push(vector),
                Ok(Err(e)) => warn!(topic = %topic, error = %e, "Topic embedding failed"),
                Err(_) => warn!(topic = %topic, "Topic embedding timed out"),
            }
        }

        if embeddings.is_empty() {
            warn!("No topic embeddings available; falling back to keyword relevance");
        }
        embeddings
    }

    /// Maximum cosine similarity between the item text and any topic.
    async fn semantic_relevance(
        &self,
        embedder: &E,
        item: &Item,
        topic_embeddings: &[Vec<f32>],
    ) -> f64 {
        let text = embed_text(item);

        let item_embedding =
            match tokio::time::timeout(self.embed_timeout, embedder.embed(&text)).await {
                Ok(Ok(vector)) => vector,
                Ok(Err(e)) => {
                    debug!(id = %item.id, error = %e, "Item embedding failed; using default relevance");
                    return DEFAULT_RELEVANCE;
                }
                Err(_) => {
                    debug!(id = %item.id, "Item embedding timed out; using default relevance");
                    return DEFAULT_RELEVANCE;
                }
            };

        topic_embeddings
            .iter()
            .map(|topic| cosine_similarity(&item_embedding, topic))
            .fold(0.0, f64::max)
    }
}

/// Title and abstract joined and truncated for the embedding provider.
fn embed_text(item: &Item) -> String {
    let mut text = format!("{} {}", item.title, item.abstract_text);
    if text.chars().count() > EMBED_TEXT_LIMIT {
        text = text.chars().take(EMBED_TEXT_LIMIT).collect();
    }
    text
}

/// Fraction of topics appearing as substrings of the lowercased
/// title+abstract, capped at 1.0. Empty topic list scores 0.0.
pub fn keyword_relevance(item: &Item, topics: &[String]) -> f64 {
    if topics.is_empty() {
        return 0.0;
    }
    let text = format!("{} {}", item.title, item.abstract_text).to_lowercase();
    let matches = topics
        .iter()
        .filter(|topic| text.contains(&topic.to_lowercase()))
        .count();
    (matches as f64 / topics.len() as f64).min(1.0)
}

/// Freshness relative to `now`: 1.0 today (or in the future), decaying
/// linearly to 0.3 at 30 days and flat beyond; 0.5 when unparseable.
pub fn recency_score(published_at: &str, now: DateTime<Utc>) -> f64 {
    let Some(published) = parse_published_at(published_at) else {
        return DEFAULT_RECENCY;
    };

    let days_ago = (now - published).num_days();
    if days_ago < 0 {
        1.0
    } else if days_ago as f64 > RECENCY_HORIZON_DAYS {
        RECENCY_FLOOR
    } else {
        1.0 - (days_ago as f64 / RECENCY_HORIZON_DAYS) * (1.0 - RECENCY_FLOOR)
    }
}

/// Publisher reputation: first table match against `source`, then `journal`,
/// then a DOI bonus, then the floor.
pub fn credibility_score(item: &Item) -> f64 {
    let source = item.source.to_lowercase();
    for (pattern, weight) in CREDIBILITY_TABLE.iter() {
        if source.contains(pattern) {
            return *weight;
        }
    }

    if let Some(journal) = item.journal.as_deref() {
        let journal = journal.to_lowercase();
        for (pattern, weight) in CREDIBILITY_TABLE.iter() {
            if journal.contains(pattern) {
                return *weight;
            }
        }
    }

    if item.doi.as_deref().is_some_and(|d| !d.is_empty()) {
        return DOI_CREDIBILITY;
    }
    CREDIBILITY_FLOOR
}

/// Preprints score highest, DOI-bearing published work medium, the rest low.
pub fn novelty_score(item: &Item) -> f64 {
    let source = item.source.to_lowercase();
    if PREPRINT_MARKERS.iter().any(|marker| source.contains(marker)) {
        0.9
    } else if item.doi.as_deref().is_some_and(|d| !d.is_empty()) {
        0.7
    } else {
        0.6
    }
}

/// Cosine similarity; defined as 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    const EPS: f64 = 1e-9;

    fn dated(now: DateTime<Utc>, days_ago: i64) -> String {
        (now - chrono::Duration::days(days_ago)).to_rfc3339()
    }

    #[test]
    fn test_recency_boundaries() {
        let now = Utc::now();
        assert!((recency_score(&dated(now, 0), now) - 1.0).abs() < EPS);
        assert!((recency_score(&dated(now, 30), now) - 0.3).abs() < EPS);
        assert!((recency_score(&dated(now, 31), now) - 0.3).abs() < EPS);
        assert!((recency_score(&dated(now, 365), now) - 0.3).abs() < EPS);
        assert!((recency_score(&dated(now, -2), now) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_recency_monotonically_non_increasing() {
        let now = Utc::now();
        let mut previous = f64::INFINITY;
        for days in 0..=30 {
            let score = recency_score(&dated(now, days), now);
            assert!(score <= previous + EPS, "recency rose at day {days}");
            previous = score;
        }
    }

    #[test]
    fn test_recency_defaults_when_unparseable() {
        let now = Utc::now();
        assert!((recency_score("", now) - 0.5).abs() < EPS);
        assert!((recency_score("not a date", now) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_credibility_source_match_wins_over_journal() {
        let item = Item {
            source: "Nature Communications".to_string(),
            journal: Some("The Verge".to_string()),
            ..Default::default()
        };
        assert!((credibility_score(&item) - 0.95).abs() < EPS);
    }

    #[test]
    fn test_credibility_journal_fallback_then_doi_then_floor() {
        let journal_only = Item {
            source: "SomeAggregator".to_string(),
            journal: Some("The Lancet".to_string()),
            ..Default::default()
        };
        assert!((credibility_score(&journal_only) - 0.90).abs() < EPS);

        let doi_only = Item {
            source: "SomeAggregator".to_string(),
            doi: Some("10.1/x".to_string()),
            ..Default::default()
        };
        assert!((credibility_score(&doi_only) - 0.75).abs() < EPS);

        let unknown = Item {
            source: "SomeAggregator".to_string(),
            ..Default::default()
        };
        assert!((credibility_score(&unknown) - 0.60).abs() < EPS);
    }

    #[test]
    fn test_novelty_classes() {
        let preprint = Item {
            source: "bioRxiv".to_string(),
            ..Default::default()
        };
        assert!((novelty_score(&preprint) - 0.9).abs() < EPS);

        let published = Item {
            source: "Crossref".to_string(),
            doi: Some("10.1/x".to_string()),
            ..Default::default()
        };
        assert!((novelty_score(&published) - 0.7).abs() < EPS);

        let news = Item {
            source: "The Verge".to_string(),
            ..Default::default()
        };
        assert!((novelty_score(&news) - 0.6).abs() < EPS);
    }

    #[test]
    fn test_keyword_relevance_fraction_and_cap() {
        let item = Item {
            title: "Deep Learning for protein folding".to_string(),
            abstract_text: "We study folding.".to_string(),
            ..Default::default()
        };

        let half = keyword_relevance(
            &item,
            &["deep learning".to_string(), "quantum".to_string()],
        );
        assert!((half - 0.5).abs() < EPS);

        let full = keyword_relevance(
            &item,
            &["deep learning".to_string(), "protein folding".to_string()],
        );
        assert!((full - 1.0).abs() < EPS);

        assert_eq!(keyword_relevance(&item, &[]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_properties() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < EPS);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < EPS);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    fn scored_item(title: &str, source: &str) -> Item {
        Item {
            title: title.to_string(),
            source: source.to_string(),
            published_at: Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_rank_is_sorted_with_full_breakdown() {
        let items = vec![
            scored_item("unrelated piece", "SomeAggregator"),
            scored_item("deep learning survey", "Nature"),
        ];
        let topics = vec!["deep learning".to_string()];

        let ranked = Scorer::without_embeddings(ScoreWeights::default())
            .score_and_rank(items, &topics)
            .await;

        assert_eq!(ranked[0].title, "deep learning survey");
        for window in ranked.windows(2) {
            assert!(window[0].score.unwrap() >= window[1].score.unwrap());
        }
        for item in &ranked {
            let total = item.score.unwrap();
            assert!((0.0..=1.0).contains(&total));
            let b = item.score_breakdown.unwrap();
            for factor in [b.relevance, b.recency, b.credibility, b.novelty] {
                assert!((0.0..=1.0).contains(&factor));
            }
        }
    }

    #[tokio::test]
    async fn test_equal_scores_preserve_input_order() {
        let mut first = scored_item("same story", "SomeAggregator");
        first.url = "https://first.example.com".to_string();
        let mut second = first.clone();
        second.url = "https://second.example.com".to_string();

        let ranked = Scorer::without_embeddings(ScoreWeights::default())
            .score_and_rank(vec![first, second], &[])
            .await;

        assert_eq!(ranked[0].url, "https://first.example.com");
        assert_eq!(ranked[1].url, "https://second.example.com");
    }

    /// Embeds topic texts and anything starting with "alpha"; fails on the
    /// rest, as a provider having a partial outage would.
    struct SelectiveEmbedder;

    impl EmbedAsync for SelectiveEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
            if text.starts_with("alpha") {
                Ok(vec![1.0, 0.0])
            } else if text.starts_with("beta") {
                Ok(vec![0.0, 1.0])
            } else {
                Err("embedding backend unavailable".into())
            }
        }
    }

    #[tokio::test]
    async fn test_semantic_relevance_is_max_cosine() {
        let scorer = Scorer::new(
            ScoreWeights::default(),
            SelectiveEmbedder,
            Duration::from_secs(5),
        );
        let items = vec![scored_item("alpha particles in imaging", "Nature")];
        let topics = vec!["alpha decay".to_string(), "beta decay".to_string()];

        let ranked = scorer.score_and_rank(items, &topics).await;
        // Item text embeds to [1,0]; best topic match is "alpha decay" at 1.0.
        assert!((ranked[0].score_breakdown.unwrap().relevance - 1.0).abs() < EPS);
    }

    #[tokio::test]
    async fn test_item_embedding_failure_degrades_to_default() {
        let scorer = Scorer::new(
            ScoreWeights::default(),
            SelectiveEmbedder,
            Duration::from_secs(5),
        );
        let items = vec![scored_item("gamma ray burst catalog", "Nature")];
        let topics = vec!["alpha decay".to_string()];

        let ranked = scorer.score_and_rank(items, &topics).await;
        assert!((ranked[0].score_breakdown.unwrap().relevance - 0.5).abs() < EPS);
    }

    #[tokio::test]
    async fn test_all_topic_embeddings_failing_falls_back_to_keywords() {
        let scorer = Scorer::new(
            ScoreWeights::default(),
            SelectiveEmbedder,
            Duration::from_secs(5),
        );
        let items = vec![scored_item("gamma ray burst catalog", "Nature")];
        let topics = vec!["gamma ray".to_string()];

        let ranked = scorer.score_and_rank(items, &topics).await;
        // Topic embedding fails, so keyword containment applies: 1/1 topics.
        assert!((ranked[0].score_breakdown.unwrap().relevance - 1.0).abs() < EPS);
    }
}
