//! Duplicate removal across sources.
//!
//! Discovery intentionally over-collects: the same paper can arrive from
//! Crossref, arXiv, and a journal feed in one run. [`deduplicate`] collapses
//! each fingerprint group to a single surviving item, preferring the most
//! information-complete record seen so far.

use crate::fingerprint::fingerprint;
use crate::models::Item;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Remove duplicate items, keeping the most complete representative.
///
/// Single pass: the first item of each fingerprint group claims an output
/// position; a later arrival with strictly greater [`completeness`] replaces
/// the kept item in that same position. Ties keep the earlier item, so the
/// result preserves first-occurrence order.
///
/// Guarantees: each fingerprint appears at most once in the result, and
/// `output.len() <= input.len()`.
#[instrument(level = "info", skip_all, fields(input = items.len()))]
pub fn deduplicate(items: Vec<Item>) -> Vec<Item> {
    let total = items.len();
    let mut kept_at: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Item> = Vec::with_capacity(total);
    let mut duplicates = 0usize;

    for item in items {
        match kept_at.entry(fingerprint(&item)) {
            Entry::Occupied(slot) => {
                duplicates += 1;
                let idx = *slot.get();
                if completeness(&item) > completeness(&unique[idx]) {
                    unique[idx] = item;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(unique.len());
                unique.push(item);
            }
        }
    }

    info!(duplicates, unique = unique.len(), "Deduplication complete");
    unique
}

/// Count of populated important fields, used to pick a duplicate-group
/// survivor.
///
/// Important fields: title, authors, abstract, text, pdf_url, doi. A list
/// counts as populated iff it is non-empty; strings iff non-empty.
pub fn completeness(item: &Item) -> usize {
    let opt = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());

    [
        !item.title.is_empty(),
        !item.authors.is_empty(),
        !item.abstract_text.is_empty(),
        opt(&item.text),
        opt(&item.pdf_url),
        opt(&item.doi),
    ]
    .into_iter()
    .filter(|&populated| populated)
    .count()
}
