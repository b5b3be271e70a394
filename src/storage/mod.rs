//! Storage module for persisting harvest artifacts
//!
//! This module handles every durable write the harvester makes:
//! - The progress file (`ProgressStore`)
//! - One result file per query (`ResultWriter`)
//! - The shared write-then-rename helper used for those and for asset files

mod progress_store;
mod results;

pub use progress_store::ProgressStore;
pub use results::{load_results, ResultWriter};

use crate::input::Query;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Value stored for a field that no extraction strategy could fill
pub const NOT_AVAILABLE: &str = "N/A";

/// Value stored when the result total could not be read
pub const UNKNOWN_TOTAL: &str = "unknown";

/// One discovered item within a query's result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub title: String,
    pub authors: String,
    pub publication_info: String,
    pub year: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub source_link: String,
    pub external_id: String,
    pub asset_downloaded: bool,
    pub asset_path: Option<String>,
}

impl ItemRecord {
    /// Records a successful (or already present) asset at `path`
    pub fn mark_downloaded(&mut self, path: &Path) {
        self.asset_downloaded = true;
        self.asset_path = Some(path.to_string_lossy().into_owned());
    }
}

/// Aggregated outcome of one query run, as written to its result file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub query_id: String,
    pub query_text: String,
    pub crawl_time: DateTime<Utc>,
    pub reported_total: String,
    pub item_count: usize,
    pub items: Vec<ItemRecord>,
}

impl QueryResult {
    pub fn new(
        query: &Query,
        crawl_time: DateTime<Utc>,
        reported_total: String,
        items: Vec<ItemRecord>,
    ) -> Self {
        Self {
            query_id: query.id.clone(),
            query_text: query.text.clone(),
            crawl_time,
            reported_total,
            item_count: items.len(),
            items,
        }
    }

    /// Number of distinct titles; title is item identity within a result set
    pub fn distinct_titles(&self) -> usize {
        let mut titles: Vec<&str> = self.items.iter().map(|i| i.title.as_str()).collect();
        titles.sort_unstable();
        titles.dedup();
        titles.len()
    }

    pub fn assets_downloaded(&self) -> usize {
        self.items.iter().filter(|i| i.asset_downloaded).count()
    }
}

/// Writes `contents` to `path` through a temporary sibling file and a rename
///
/// Readers of `path` see either the previous file or the complete new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)
}

/// Builds a `Persistence` error for a failed write to `path`
pub(crate) fn persistence_error(path: &Path, message: impl ToString) -> HarvestError {
    HarvestError::Persistence {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Reduces `raw` to a filesystem-safe stem of at most `max_chars` characters
///
/// Keeps alphanumerics, spaces, hyphens and underscores; everything else is dropped.
pub fn safe_file_stem(raw: &str, max_chars: usize) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    filtered.trim().chars().take(max_chars).collect()
}
