//! Durable crawl progress
//!
//! `CrawlProgress` is the structure written to the progress file. It only
//! records terminal outcomes: the set of completed query ids and an
//! append-only log of failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One failed query outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEntry {
    pub query_id: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Terminal outcomes of every query seen so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    /// Completed query ids, in completion order, without duplicates
    #[serde(default)]
    pub completed: Vec<String>,

    /// Every failure ever recorded; the same id may appear more than once
    #[serde(default)]
    pub failed: Vec<FailedEntry>,

    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
}

impl CrawlProgress {
    /// Returns true if the query has completed in some run
    pub fn is_completed(&self, query_id: &str) -> bool {
        self.completed.iter().any(|id| id == query_id)
    }

    /// Inserts the id into the completed set
    pub fn record_completed(&mut self, query_id: &str, at: DateTime<Utc>) {
        if !self.is_completed(query_id) {
            self.completed.push(query_id.to_string());
        }
        self.last_activity = Some(at);
    }

    /// Appends a failure entry
    pub fn record_failed(&mut self, query_id: &str, error: &str, at: DateTime<Utc>) {
        self.failed.push(FailedEntry {
            query_id: query_id.to_string(),
            error: error.to_string(),
            timestamp: at,
        });
        self.last_activity = Some(at);
    }

    /// Number of distinct ids in the failed log that have not since completed
    pub fn outstanding_failures(&self) -> usize {
        let mut ids: Vec<&str> = self
            .failed
            .iter()
            .map(|f| f.query_id.as_str())
            .filter(|id| !self.is_completed(id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}
