//! Harvest orchestrator - main query loop
//!
//! Runs the queries strictly one after another. For each query it:
//! - Walks the paginated result list
//! - Downloads the asset behind every item, best effort
//! - Writes the query's result file
//! - Records the terminal outcome in the progress file
//! - Waits a large randomized delay before the next query
//!
//! Progress is only written for terminal outcomes, so a query cut short by an
//! interrupt is simply absent from the progress file and runs again next time.

use crate::config::Config;
use crate::crawler::fetcher::AssetFetcher;
use crate::crawler::pagination::PaginationController;
use crate::crawler::pipeline::DownloadPipeline;
use crate::crawler::scheduler::{DelayKind, RateScheduler};
use crate::input::Query;
use crate::renderer::Session;
use crate::state::{CrawlProgress, QueryState};
use crate::storage::{ProgressStore, QueryResult, ResultWriter};
use crate::{HarvestError, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Queries not yet completed when the run started
    pub pending: usize,

    /// Queries skipped because an earlier run completed them
    pub skipped: usize,

    pub completed: usize,
    pub failed: usize,

    /// Items recorded across the completed queries
    pub items: usize,

    pub assets_downloaded: usize,

    /// True if the run stopped on an interrupt before finishing the list
    pub interrupted: bool,
}

/// Owns the session and every per-run component
pub struct Orchestrator {
    session: Session,
    pagination: PaginationController,
    pipeline: DownloadPipeline,
    writer: ResultWriter,
    progress: ProgressStore,
    scheduler: RateScheduler,
    downloads_enabled: bool,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        session: Session,
        fetcher: impl AssetFetcher + 'static,
        progress: ProgressStore,
        cancel: CancellationToken,
    ) -> Result<Self> {
        Ok(Self {
            session,
            pagination: PaginationController::new(config),
            pipeline: DownloadPipeline::new(config, fetcher)?,
            writer: ResultWriter::new(&config.output.results_dir),
            progress,
            scheduler: RateScheduler::new(&config.politeness, cancel.clone()),
            downloads_enabled: config.downloads.enabled,
            cancel,
        })
    }

    pub fn progress(&self) -> &CrawlProgress {
        self.progress.progress()
    }

    /// Runs every query in `queries` that is not already completed
    ///
    /// Per-query failures are recorded and the loop moves on. Only a failure
    /// to write the progress file ends the run with an error.
    pub async fn run(&mut self, queries: &[Query]) -> Result<RunSummary> {
        let pending: Vec<&Query> = queries
            .iter()
            .filter(|q| !self.progress.is_completed(&q.id))
            .collect();

        let mut summary = RunSummary {
            pending: pending.len(),
            skipped: queries.len() - pending.len(),
            ..RunSummary::default()
        };
        tracing::info!(
            "{} queries to run ({} already completed)",
            summary.pending,
            summary.skipped
        );

        for (idx, query) in pending.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            tracing::info!(
                "[{}/{}] Query #{}: {}",
                idx + 1,
                pending.len(),
                query.id,
                preview(&query.text)
            );
            let mut state = QueryState::Pending;
            transition(&mut state, QueryState::Running, &query.id);

            // Only the query's own work races the interrupt; the writes below never do
            let cancel = self.cancel.clone();
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(HarvestError::Interrupted),
                result = self.process_query(query) => result,
            };

            match outcome {
                Ok(result) => match self.writer.persist(&result) {
                    Ok(_) => {
                        self.progress.mark_completed(&query.id)?;
                        transition(&mut state, QueryState::Done, &query.id);
                        summary.completed += 1;
                        summary.items += result.item_count;
                        summary.assets_downloaded += result.assets_downloaded();
                    }
                    Err(e) => {
                        tracing::error!("Could not save results of query #{}: {}", query.id, e);
                        self.progress.mark_failed(&query.id, &e.to_string())?;
                        transition(&mut state, QueryState::Failed, &query.id);
                        summary.failed += 1;
                    }
                },
                Err(HarvestError::Interrupted) => {
                    tracing::warn!(
                        "Interrupted during query #{}; it will run again next time",
                        query.id
                    );
                    summary.interrupted = true;
                    break;
                }
                Err(e) => {
                    tracing::error!("Query #{} failed: {}", query.id, e);
                    self.progress.mark_failed(&query.id, &e.to_string())?;
                    transition(&mut state, QueryState::Failed, &query.id);
                    summary.failed += 1;
                }
            }

            if idx + 1 < pending.len() {
                match self.scheduler.delay(DelayKind::Large).await {
                    Ok(_) => {}
                    Err(HarvestError::Interrupted) => {
                        summary.interrupted = true;
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(
            "Run finished: {} completed, {} failed, {} skipped, {} items, {} assets{}",
            summary.completed,
            summary.failed,
            summary.skipped,
            summary.items,
            summary.assets_downloaded,
            if summary.interrupted { " (interrupted)" } else { "" }
        );
        Ok(summary)
    }

    /// Extracts one query's items and downloads their assets
    async fn process_query(&mut self, query: &Query) -> Result<QueryResult> {
        let crawl_time = Utc::now();
        let extracted = self
            .pagination
            .extract_query(&mut self.session, &mut self.scheduler, &query.text)
            .await?;

        let mut items = extracted.items;
        if self.downloads_enabled {
            let total = items.len();
            let mut downloaded = 0;
            for (idx, item) in items.iter_mut().enumerate() {
                tracing::info!("[{}/{}] {}", idx + 1, total, preview(&item.title));
                if self.pipeline.fetch_asset(&mut self.session, item).await {
                    downloaded += 1;
                }
                if idx + 1 < total {
                    self.scheduler.delay(DelayKind::Small).await?;
                }
            }
            if total > 0 {
                tracing::info!("Assets for query #{}: {}/{}", query.id, downloaded, total);
            }
        }

        let result = QueryResult::new(query, crawl_time, extracted.reported_total, items);
        tracing::info!(
            "Query #{}: {} items, {} distinct titles, {} pages",
            query.id,
            result.item_count,
            result.distinct_titles(),
            extracted.pages_read
        );
        Ok(result)
    }

    /// Releases the session; called once whatever the outcome of the run
    pub async fn close(&mut self) {
        if let Err(e) = self.session.close().await {
            tracing::warn!("Failed to close the session: {}", e);
        }
    }
}

fn transition(state: &mut QueryState, next: QueryState, query_id: &str) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid transition {} -> {}",
        state,
        next
    );
    tracing::debug!("Query #{}: {} -> {}", query_id, state, next);
    *state = next;
}

fn preview(text: &str) -> String {
    const MAX: usize = 100;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    }
}
