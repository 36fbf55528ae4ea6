//! Utility functions for date parsing, string cleanup, and file system checks.
//!
//! This module provides helper functions used throughout the pipeline:
//! - Publication-date parsing across the formats sources actually emit
//! - String truncation for logging
//! - HTML tag/entity stripping for feed summaries
//! - File system validation for the output directory

use chrono::{DateTime, NaiveDate, Utc};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Parse a publication date string into a UTC instant.
///
/// Sources disagree on date formats: APIs emit RFC 3339 / ISO dates, RSS
/// feeds emit RFC 2822 (`Tue, 06 May 2025 14:30:00 GMT`), and some APIs emit
/// a bare `YYYY-MM-DD`. Each form is tried in turn; a bare date is taken as
/// midnight UTC.
///
/// # Returns
///
/// `Some(instant)` if any format matched, `None` otherwise. Callers decide
/// the fallback (the scorer defaults to a neutral recency).
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Date-only prefix, e.g. "2024-01-01" or "2024-01-01 animal study".
    let prefix: String = raw.chars().take(10).collect();
    if let Ok(date) = NaiveDate::parse_from_str(&prefix, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }

    None
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Strip HTML tags and common entities from feed-provided text.
///
/// Feed descriptions routinely embed markup. This is a plain tag scanner,
/// not an HTML parser; structural extraction belongs to the external
/// extraction stage.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
