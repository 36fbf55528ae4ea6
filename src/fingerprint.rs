//! Stable identity keys for duplicate detection.
//!
//! The same paper routinely arrives from several sources with slightly
//! different metadata: a Crossref record with a DOI, an arXiv entry with a
//! native id, a journal feed entry with only a title. [`fingerprint`] derives
//! one deterministic key per item so the deduplicator can group them.
//!
//! # Key priority
//!
//! Identifiers vary wildly in reliability across sources, so the rules are
//! ordered and the first match wins:
//!
//! 1. A DOI, normalized to lowercase — globally stable across re-discovery.
//! 2. A native id carrying a recognized source prefix (`arXiv:`, `PMID:`),
//!    lowercased.
//! 3. A composite of normalized title tokens, first author, and publication
//!    year. Titles drift in whitespace and punctuation between sources, so
//!    the title part is reduced to its first ten alphanumeric-only lowercase
//!    tokens.

use crate::models::Item;
use once_cell::sync::Lazy;
use regex::Regex;

/// Number of normalized title tokens contributing to the composite key.
const TITLE_TOKENS: usize = 10;

static NATIVE_ID_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(arxiv|pmid):").unwrap());

/// Derive the duplicate-detection key for an item.
///
/// Deterministic and total: every item yields a non-empty key, even one with
/// no usable metadata (the composite separators remain).
pub fn fingerprint(item: &Item) -> String {
    if let Some(doi) = item.doi.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        return format!("doi:{}", doi.to_lowercase());
    }

    let id = item.id.trim();
    if NATIVE_ID_PREFIX.is_match(id) {
        return id.to_lowercase();
    }

    let title_key = normalize_title(&item.title);
    let first_author = item
        .authors
        .first()
        .map(|a| a.trim().to_lowercase())
        .unwrap_or_default();
    let year = publication_year(&item.published_at);

    format!("{title_key}|{first_author}|{year}")
}

/// First [`TITLE_TOKENS`] whitespace-separated tokens of the title, lowercased
/// with everything but alphanumerics and whitespace removed.
fn normalize_title(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .take(TITLE_TOKENS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leading four characters of the date string, or empty when too short.
fn publication_year(published_at: &str) -> String {
    let trimmed = published_at.trim();
    if trimmed.chars().count() >= 4 {
        trimmed.chars().take(4).collect()
    } else {
        String::new()
    }
}
