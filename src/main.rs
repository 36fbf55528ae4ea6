//! # Research Radar
//!
//! A discovery pipeline that aggregates research papers and news articles
//! from multiple heterogeneous sources, removes duplicates, and ranks the
//! survivors by relevance, recency, credibility, and novelty. The ranked
//! candidate list is handed off (as JSON) to downstream summarization and
//! publishing.
//!
//! ## Features
//!
//! - Discovers content from research APIs (arXiv, Crossref, PubMed, bioRxiv)
//!   and from configured journal and news RSS/Atom feeds
//! - Collapses cross-source duplicates by DOI, native id, or normalized
//!   title fingerprint, keeping the most complete record
//! - Scores items with semantic embeddings when a provider is configured,
//!   degrading gracefully to keyword matching when not
//! - Isolates every source failure: a dead API costs its own items only
//!
//! ## Usage
//!
//! ```sh
//! research_radar --config config.yaml --date 2025-05-06
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Discovery**: Fan out to all enabled sources for the topic list
//! 2. **Deduplication**: Collapse fingerprint groups to one survivor each
//! 3. **Scoring**: Attach four-factor scores and sort descending
//! 4. **Output**: Write the ranked candidate list for downstream stages

use chrono::Local;
use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod dedup;
mod discovery;
mod embedding;
mod fingerprint;
mod models;
mod scorer;
mod sources;
mod store;
mod utils;

use cli::Cli;
use config::Config;
use dedup::deduplicate;
use discovery::DiscoveryCoordinator;
use embedding::{HttpEmbedder, RetryEmbed};
use scorer::Scorer;
use store::JsonStore;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("research_radar starting up");

    // Parse CLI and load config
    let args = Cli::parse();
    debug!(?args.config, ?args.date, "Parsed CLI arguments");

    let mut config = Config::load(&args.config)?;
    if !args.topics.is_empty() {
        config.topics = args.topics.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.storage.output_dir = output_dir.clone();
    }

    // Misconfiguration is the one hard failure, surfaced once at startup.
    config.validate()?;
    ensure_writable_dir(&config.storage.output_dir).await?;

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    info!(
        date = %date,
        topics = %config.topics.iter().join(", "),
        backfill_days = config.schedule.backfill_days,
        "Run parameters"
    );

    // ---- Discovery ----
    let coordinator = DiscoveryCoordinator::from_config(&config)?;
    info!(sources = coordinator.source_count(), "Source roster built");

    let discovered = coordinator.discover_all(&config.topics, date).await;
    if discovered.is_empty() {
        info!("No items discovered; nothing to process");
        return Ok(());
    }

    // ---- Deduplication ----
    let unique = deduplicate(discovered);

    // ---- Scoring ----
    let weights = config.scoring.weights;
    let embed_timeout = Duration::from_secs(config.scoring.embedding.timeout_secs);
    let ranked = match &config.api_keys.openai {
        Some(key) => {
            let embedder = HttpEmbedder::new(
                key,
                &config.scoring.embedding.endpoint,
                &config.scoring.embedding.model,
                embed_timeout,
            )?;
            let embedder = RetryEmbed::new(embedder, 2, Duration::from_secs(1));
            info!(model = %config.scoring.embedding.model, "Scoring with semantic embeddings");
            Scorer::new(weights, embedder, embed_timeout)
                .score_and_rank(unique, &config.topics)
                .await
        }
        None => {
            warn!("No embedding API key configured; scoring with keyword relevance");
            Scorer::without_embeddings(weights)
                .score_and_rank(unique, &config.topics)
                .await
        }
    };

    // ---- Output ----
    let store = JsonStore::new(&config.storage.output_dir);
    let path = store.save(date, &ranked).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        candidates = ranked.len(),
        path = %path.display(),
        "Execution complete"
    );

    Ok(())
}
