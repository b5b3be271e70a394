//! Query input loading
//!
//! Queries come from a CSV file with an `id` and a `text` column, one row per
//! query. Row order is preserved; it is the order the orchestrator runs them in.

use crate::{HarvestError, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// A single search expression with a stable id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    id: String,
    text: String,
}

/// Loads the ordered query list from a CSV file
///
/// Surrounding double quotes left in the `text` column are stripped. Rows with
/// an empty id are skipped with a warning; a file with no usable rows is an
/// error, since there is nothing to run.
pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let file = File::open(path).map_err(|e| {
        HarvestError::Input(format!("could not open {}: {}", path.display(), e))
    })?;

    let queries = read_queries(file)?;
    if queries.is_empty() {
        return Err(HarvestError::Input(format!(
            "no queries found in {} (expected columns: id, text)",
            path.display()
        )));
    }

    tracing::info!("Loaded {} queries from {}", queries.len(), path.display());
    Ok(queries)
}

fn read_queries<R: std::io::Read>(reader: R) -> Result<Vec<Query>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut queries = Vec::new();
    for (line, row) in rdr.deserialize::<QueryRow>().enumerate() {
        let row = row?;
        if row.id.is_empty() {
            tracing::warn!("Skipping query row {} with an empty id", line + 1);
            continue;
        }
        queries.push(Query {
            id: row.id,
            text: row.text.trim_matches('"').to_string(),
        });
    }

    Ok(queries)
}

/// Keeps only queries whose numeric id is at least `start_from`
///
/// Ids that are not numeric cannot be ordered against the threshold and are kept.
pub fn filter_start_from(queries: Vec<Query>, start_from: u64) -> Vec<Query> {
    queries
        .into_iter()
        .filter(|q| q.id.parse::<u64>().map_or(true, |id| id >= start_from))
        .collect()
}
