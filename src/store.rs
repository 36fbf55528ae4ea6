//! JSON persistence sink for ranked candidate lists.
//!
//! Each run writes one file under a date directory:
//!
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     └── candidates.json
//! ```
//!
//! The store implements the pipeline's whole persistence contract — save a
//! batch, look an item up by id — and nothing more. Downstream consumers
//! (summarization, publishing) read the same file.

use crate::models::Item;
use chrono::NaiveDate;
use std::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

const CANDIDATES_FILE: &str = "candidates.json";

/// Date-keyed JSON file store.
pub struct JsonStore {
    output_dir: PathBuf,
}

impl JsonStore {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    fn candidates_path(&self, date: NaiveDate) -> PathBuf {
        self.output_dir.join(date.to_string()).join(CANDIDATES_FILE)
    }

    /// Write the ranked candidate list for a date, replacing any previous
    /// list for that date.
    #[instrument(level = "info", skip_all, fields(date = %date, count = items.len()))]
    pub async fn save(&self, date: NaiveDate, items: &[Item]) -> Result<PathBuf, Box<dyn Error>> {
        let dir = self.output_dir.join(date.to_string());
        if let Err(e) = fs::create_dir_all(&dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create output dir");
            return Err(e.into());
        }

        let path = dir.join(CANDIDATES_FILE);
        let json = serde_json::to_string(items)?;
        fs::write(&path, json).await?;
        info!(path = %path.display(), "Wrote candidate list");
        Ok(path)
    }

    /// Look up one item by id in a date's saved list.
    ///
    /// A date that was never saved yields `Ok(None)`, not an error.
    pub async fn get(&self, date: NaiveDate, id: &str) -> Result<Option<Item>, Box<dyn Error>> {
        let path = self.candidates_path(date);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let items: Vec<Item> = serde_json::from_str(&raw)?;
        Ok(items.into_iter().find(|item| item.id == id))
    }
}
