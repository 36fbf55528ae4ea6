//! YAML configuration with environment overrides.
//!
//! Configuration mirrors the deployment shape: topics to track, the discovery
//! schedule, crawling limits, the source roster, scoring weights, and storage
//! location. Secrets (`OPENAI_API_KEY`, `CROSSREF_EMAIL`) are taken from the
//! environment when present, overriding whatever the file says, so config
//! files can be committed without credentials.
//!
//! Every section has defaults; an empty file is valid but will fail
//! [`Config::validate`] because it enables no sources.

use crate::scorer::ScoreWeights;
use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Topics to search for across all sources.
    pub topics: Vec<String>,
    pub schedule: ScheduleConfig,
    pub crawling: CrawlingConfig,
    pub research_sources: ResearchSources,
    pub news_sources: Vec<NewsSourceConfig>,
    pub scoring: ScoringConfig,
    pub api_keys: ApiKeys,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// How many days before the target date the discovery window opens.
    pub backfill_days: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { backfill_days: 2 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlingConfig {
    /// User-Agent header sent with every upstream request.
    pub user_agent: String,
    /// Cap on items requested from a single API source per topic.
    pub max_per_source: usize,
    /// Per-request timeout for upstream calls, in seconds.
    pub request_timeout_secs: u64,
    /// How many source adapters run concurrently.
    pub parallel_sources: usize,
}

impl Default for CrawlingConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("research-radar/{}", env!("CARGO_PKG_VERSION")),
            max_per_source: 200,
            request_timeout_secs: 30,
            parallel_sources: 4,
        }
    }
}

/// Research-side source roster: structured APIs plus journal feeds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResearchSources {
    pub apis: Vec<ApiSourceConfig>,
    pub journals: Vec<FeedSourceConfig>,
}

/// One structured research API (arXiv, Crossref, PubMed, bioRxiv).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSourceConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A journal RSS/Atom feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSourceConfig {
    pub name: String,
    pub rss: String,
}

/// A news source: either a plain feed or a search-URL template with a
/// `{topic}` placeholder (Google-News style).
#[derive(Debug, Clone, Deserialize)]
pub struct NewsSourceConfig {
    pub name: String,
    #[serde(default)]
    pub rss: Option<String>,
    #[serde(default)]
    pub search_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible API base URL.
    pub endpoint: String,
    pub model: String,
    /// Hard bound on a single embedding lookup, in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    /// Embedding provider key; absent means keyword-fallback relevance.
    pub openai: Option<String>,
    /// Contact email sent to Crossref's polite pool.
    pub crossref_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory receiving the ranked candidate lists.
    pub output_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: "./output".to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a YAML file and apply environment overrides.
    pub fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("cannot read config file {path}: {e}"))?;
        let mut config: Config = serde_yaml::from_str(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override secrets from the environment when set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.api_keys.openai = Some(key);
            }
        }
        if let Ok(email) = std::env::var("CROSSREF_EMAIL") {
            if !email.trim().is_empty() {
                self.api_keys.crossref_email = Some(email);
            }
        }
    }

    /// Number of sources that would participate in discovery.
    pub fn enabled_source_count(&self) -> usize {
        self.research_sources
            .apis
            .iter()
            .filter(|api| api.enabled)
            .count()
            + self.research_sources.journals.len()
            + self.news_sources.len()
    }

    /// Surface misconfiguration once at startup instead of per item.
    ///
    /// # Errors
    ///
    /// Fails when no sources are enabled or a scoring weight is negative.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.enabled_source_count() == 0 {
            return Err("no sources enabled; nothing to discover".into());
        }
        let w = &self.scoring.weights;
        if [w.relevance, w.recency, w.credibility, w.novelty]
            .iter()
            .any(|weight| *weight < 0.0)
        {
            return Err("scoring weights must be non-negative".into());
        }
        Ok(())
    }
}
