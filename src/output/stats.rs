//! Status report built from the files a run leaves behind
//!
//! Everything here is read-only: the progress file, the result directory and
//! the asset directory are inspected, never modified.

use crate::config::Config;
use crate::input::load_queries;
use crate::storage::{load_results, ProgressStore};
use crate::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Snapshot of a harvest's durable state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    /// Queries in the input file, if it could be read
    pub total_queries: Option<usize>,

    /// Input queries not yet completed
    pub remaining: Option<usize>,

    pub completed: usize,

    /// Entries in the failed log (one per failed attempt)
    pub failure_entries: usize,

    /// Queries that failed and have not completed since
    pub outstanding_failures: usize,

    pub last_activity: Option<DateTime<Utc>>,

    pub result_files: usize,

    /// Items across all result files
    pub items: usize,

    /// Items whose asset is recorded as downloaded
    pub assets_marked: usize,

    /// Files with the asset extension in the asset directory
    pub asset_files: usize,
    pub asset_bytes: u64,
}

/// Gathers the status report for `config`
///
/// A missing query file or asset directory is not an error; the matching
/// counts are simply left empty.
pub fn gather_status(config: &Config) -> Result<StatusReport> {
    let progress = ProgressStore::load(Path::new(&config.output.progress_path))?;
    let results = load_results(Path::new(&config.output.results_dir))?;

    let queries = match load_queries(Path::new(&config.input.queries_path)) {
        Ok(queries) => Some(queries),
        Err(e) => {
            tracing::debug!("Query list unavailable for status: {}", e);
            None
        }
    };

    let (asset_files, asset_bytes) =
        count_assets(Path::new(&config.downloads.asset_dir), &config.downloads.extension);

    Ok(StatusReport {
        total_queries: queries.as_ref().map(Vec::len),
        remaining: queries
            .as_ref()
            .map(|qs| qs.iter().filter(|q| !progress.is_completed(&q.id)).count()),
        completed: progress.completed.len(),
        failure_entries: progress.failed.len(),
        outstanding_failures: progress.outstanding_failures(),
        last_activity: progress.last_activity,
        result_files: results.len(),
        items: results.iter().map(|r| r.item_count).sum(),
        assets_marked: results.iter().map(|r| r.assets_downloaded()).sum(),
        asset_files,
        asset_bytes,
    })
}

fn count_assets(dir: &Path, extension: &str) -> (usize, u64) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return (0, 0);
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
        })
        .filter_map(|entry| entry.metadata().ok())
        .filter(|meta| meta.is_file())
        .fold((0, 0), |(count, bytes), meta| (count + 1, bytes + meta.len()))
}

/// Prints the report to stdout
pub fn print_status(report: &StatusReport) {
    println!("=== Harvest Status ===\n");

    println!("Queries:");
    match report.total_queries {
        Some(total) => println!("  Total: {}", total),
        None => println!("  Total: (query file unavailable)"),
    }
    println!("  Completed: {}", report.completed);
    if let Some(remaining) = report.remaining {
        println!("  Remaining: {}", remaining);
    }
    println!(
        "  Failed: {} outstanding ({} failure entries)",
        report.outstanding_failures, report.failure_entries
    );
    match report.last_activity {
        Some(at) => println!("  Last activity: {}", at.to_rfc3339()),
        None => println!("  Last activity: never"),
    }
    println!();

    println!("Results:");
    println!("  Result files: {}", report.result_files);
    println!("  Items: {}", report.items);
    println!("  Assets recorded: {}", report.assets_marked);
    println!();

    println!("Assets on disk:");
    println!("  Files: {}", report.asset_files);
    println!(
        "  Size: {:.1} MB",
        report.asset_bytes as f64 / (1024.0 * 1024.0)
    );

    if let Some(total) = report.total_queries {
        let done = if total > 0 {
            (report.completed.min(total) as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("\nCompletion: {:.1}%", done);
    }
}
