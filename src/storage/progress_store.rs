//! JSON-file backed progress store
//!
//! Every mutation rewrites the whole progress file before returning, so a
//! crash right after a call still leaves the file consistent with it.

use crate::state::CrawlProgress;
use crate::storage::{persistence_error, write_atomic};
use crate::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Durable record of completed and failed queries
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    progress: CrawlProgress,
}

impl ProgressStore {
    /// Opens the store at `path`, loading any prior progress
    pub fn open(path: &Path) -> Result<Self> {
        let progress = Self::load(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            progress,
        })
    }

    /// Reads the progress file, or returns an empty progress if there is none
    ///
    /// A file that exists but cannot be read or parsed is an error: silently
    /// starting over would re-run every completed query.
    pub fn load(path: &Path) -> Result<CrawlProgress> {
        if !path.exists() {
            tracing::info!("No progress file at {}, starting fresh", path.display());
            return Ok(CrawlProgress::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| persistence_error(path, e))?;
        let progress: CrawlProgress = serde_json::from_str(&content)
            .map_err(|e| persistence_error(path, format!("unreadable progress file: {}", e)))?;

        tracing::info!(
            "Resumed progress: {} completed, {} failure entries",
            progress.completed.len(),
            progress.failed.len()
        );
        Ok(progress)
    }

    pub fn progress(&self) -> &CrawlProgress {
        &self.progress
    }

    pub fn is_completed(&self, query_id: &str) -> bool {
        self.progress.is_completed(query_id)
    }

    /// Records a completed query and persists
    pub fn mark_completed(&mut self, query_id: &str) -> Result<()> {
        let mut next = self.progress.clone();
        next.record_completed(query_id, Utc::now());
        self.commit(next)
    }

    /// Appends a failure for the query and persists
    pub fn mark_failed(&mut self, query_id: &str, error: &str) -> Result<()> {
        let mut next = self.progress.clone();
        next.record_failed(query_id, error, Utc::now());
        self.commit(next)
    }

    /// Clears all recorded progress and persists the empty state
    pub fn reset(&mut self) -> Result<()> {
        self.commit(CrawlProgress::default())
    }

    /// Writes `next` to disk and only then adopts it in memory
    fn commit(&mut self, next: CrawlProgress) -> Result<()> {
        let json = serde_json::to_vec_pretty(&next)?;
        write_atomic(&self.path, &json).map_err(|e| persistence_error(&self.path, e))?;
        self.progress = next;
        Ok(())
    }
}
