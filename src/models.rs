//! Data models for discovered items and their scoring annotations.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Item`]: A candidate research paper or news article, from discovery
//!   through ranking
//! - [`ItemType`]: Whether an item is a research paper or a news article
//! - [`ScoreBreakdown`]: The four per-factor sub-scores attached by the scorer
//!
//! An [`Item`] is created by a source adapter with partial fields, possibly
//! enriched by external extraction, merged or dropped by the deduplicator, and
//! finally annotated by the scorer. Fields that only exist after a certain
//! stage (`text`, `score`, `score_breakdown`) are explicit `Option`s rather
//! than an untyped map, so a missing field is a type error instead of a
//! runtime surprise.
//!
//! Serialized field names (`abstract`, `type`) match the upstream JSON shape
//! consumed by the summarization stage.

use serde::{Deserialize, Serialize};

/// Classification of a discovered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// A research paper (preprint or published).
    #[default]
    Research,
    /// A news article.
    News,
}

/// A candidate item flowing through the discovery → dedup → score pipeline.
///
/// # Lifecycle
///
/// Source adapters populate the identification and bibliographic fields.
/// External extraction may fill `text`. The scorer populates `score` and
/// `score_breakdown`; both are `None` before scoring.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Item {
    /// Best available stable identifier: a DOI, a prefixed source-native id
    /// such as `arXiv:2401.01234v1` or `PMID:12345`, or a source-assigned key.
    pub id: String,
    /// Canonical URL for the item.
    pub url: String,
    /// Title as reported by the source.
    pub title: String,
    /// Ordered author names; empty when the source reports none.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Abstract or summary text; empty when unavailable.
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    /// Publication date string as reported by the source (ISO where the
    /// upstream provides it, RFC 2822 for most feeds).
    #[serde(default)]
    pub published_at: String,
    /// Name of the source that discovered the item.
    pub source: String,
    /// Research paper or news article.
    #[serde(rename = "type", default)]
    pub kind: ItemType,
    /// Digital Object Identifier, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Journal or container title, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    /// Direct PDF link, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    /// Full text, filled in by the external extraction stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Weighted total score in [0,1]; present only after scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Per-factor sub-scores; present only after scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<ScoreBreakdown>,
}

/// The four sub-scores combined into an item's total score.
///
/// Each factor is normalized to [0,1] before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScoreBreakdown {
    /// Semantic or keyword similarity to the configured topics.
    pub relevance: f64,
    /// Freshness relative to the scoring run.
    pub recency: f64,
    /// Publisher reputation from the static credibility table.
    pub credibility: f64,
    /// Preprint/published/news classification.
    pub novelty: f64,
}
