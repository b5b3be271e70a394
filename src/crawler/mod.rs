//! Harvest pipeline
//!
//! This module contains the core harvesting logic, including:
//! - Politeness scheduling between queries and page actions
//! - Ordered extraction strategies for fields and links
//! - Result-list pagination
//! - Asset resolution, fetching and validation
//! - The orchestrator loop with resume and interrupt handling

mod coordinator;
mod fetcher;
mod pagination;
mod pipeline;
mod scheduler;
mod strategy;

pub use coordinator::{Orchestrator, RunSummary};
pub use fetcher::{
    build_http_client, cookie_header, AssetFetcher, AssetRequest, FetchedAsset, HttpAssetFetcher,
};
pub use pagination::{build_query_url, external_id, ExtractedQuery, PaginationController};
pub use pipeline::{asset_filename, DownloadPipeline};
pub use scheduler::{DelayKind, DelayWindow, RateScheduler};
pub use strategy::{
    AttributeStrategy, ExtractionStrategy, PatternStrategy, StrategyChain, TextStrategy,
};

use crate::config::Config;
use crate::input::{filter_start_from, load_queries};
use crate::renderer::{HttpRenderer, Session};
use crate::storage::ProgressStore;
use crate::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Options that change which queries a run covers
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Discard recorded progress before starting
    pub fresh: bool,

    /// Skip queries whose numeric id is below this value
    pub start_from: Option<u64>,
}

/// Runs a complete harvest with the HTTP renderer and fetcher
///
/// This is the main entry point for a run. It will:
/// 1. Load the query list
/// 2. Open (or reset) the progress file
/// 3. Build the page session and the asset fetcher
/// 4. Run every outstanding query
/// 5. Close the session, whatever the outcome
pub async fn run_harvest(
    config: Config,
    options: RunOptions,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let mut queries = load_queries(Path::new(&config.input.queries_path))?;
    if let Some(start_from) = options.start_from {
        queries = filter_start_from(queries, start_from);
        tracing::info!("Starting from query #{}: {} queries left", start_from, queries.len());
    }

    let mut progress = ProgressStore::open(Path::new(&config.output.progress_path))?;
    if options.fresh {
        tracing::info!("Discarding recorded progress");
        progress.reset()?;
    }

    let renderer =
        HttpRenderer::new(&config.source.user_agent, config.source.page_load_timeout())?;
    let fetcher =
        HttpAssetFetcher::new(&config.source.user_agent, config.downloads.fetch_timeout())?;
    let mut orchestrator =
        Orchestrator::new(&config, Session::new(renderer), fetcher, progress, cancel)?;

    let outcome = orchestrator.run(&queries).await;
    orchestrator.close().await;
    outcome
}
