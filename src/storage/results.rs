//! Per-query result files

use crate::storage::{persistence_error, safe_file_stem, write_atomic, QueryResult};
use crate::Result;
use std::path::{Path, PathBuf};

/// Writes one JSON file per query, replacing any earlier run's file wholesale
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the result file for `query_id`
    pub fn path_for(&self, query_id: &str) -> PathBuf {
        self.dir
            .join(format!("query_{}_results.json", safe_file_stem(query_id, 64)))
    }

    /// Serializes and atomically writes `result`, returning the file path
    pub fn persist(&self, result: &QueryResult) -> Result<PathBuf> {
        let path = self.path_for(&result.query_id);
        let json = serde_json::to_vec_pretty(result)?;
        write_atomic(&path, &json).map_err(|e| persistence_error(&path, e))?;
        tracing::info!("Results saved to {}", path.display());
        Ok(path)
    }

    /// Reads back the result file for `query_id`, if one exists
    pub fn load(&self, query_id: &str) -> Result<Option<QueryResult>> {
        let path = self.path_for(query_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Loads every result file in `dir`, skipping files that do not parse
pub fn load_results(dir: &Path) -> Result<Vec<QueryResult>> {
    let mut results = Vec::new();
    if !dir.exists() {
        return Ok(results);
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_result = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with("query_") && n.ends_with("_results.json"));
        if !is_result {
            continue;
        }

        match std::fs::read_to_string(&path)
            .map_err(crate::HarvestError::from)
            .and_then(|c| serde_json::from_str::<QueryResult>(&c).map_err(Into::into))
        {
            Ok(result) => results.push(result),
            Err(e) => tracing::warn!("Skipping unreadable result file {}: {}", path.display(), e),
        }
    }

    results.sort_by(|a, b| a.query_id.cmp(&b.query_id));
    Ok(results)
}
