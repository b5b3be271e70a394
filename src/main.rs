//! Query-Harvest main entry point
//!
//! This is the command-line interface for the Query-Harvest orchestrator.

use anyhow::Context;
use clap::Parser;
use query_harvest::config::{load_config_with_hash, Config};
use query_harvest::crawler::{build_query_url, run_harvest, RunOptions};
use query_harvest::input::{filter_start_from, load_queries};
use query_harvest::output::{gather_status, print_status};
use query_harvest::storage::ProgressStore;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Query-Harvest: a polite, resumable search-and-retrieve orchestrator
///
/// Query-Harvest runs a list of search queries against a rate-sensitive
/// source, records every result item, downloads the asset behind each item,
/// and resumes where it stopped after an interruption.
#[derive(Parser, Debug)]
#[command(name = "query-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite, resumable search-and-retrieve orchestrator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume from the progress file (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Discard recorded progress and run every query again
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Skip queries whose numeric id is below N
    #[arg(long, value_name = "N")]
    start_from: Option<u64>,

    /// Validate config and list the queries that would run, without running them
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Show progress, result and asset counts and exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.fresh, cli.start_from)?;
    } else if cli.status {
        handle_status(&config)?;
    } else {
        let options = RunOptions {
            fresh: cli.fresh,
            start_from: cli.start_from,
        };
        handle_harvest(config, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("query_harvest=info,warn"),
            1 => EnvFilter::new("query_harvest=debug,info"),
            2 => EnvFilter::new("query_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the settings and the queries that would run
fn handle_dry_run(config: &Config, fresh: bool, start_from: Option<u64>) -> anyhow::Result<()> {
    println!("=== Query-Harvest Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  Query parameter: {}", config.source.query_param);
    println!("  Max pages per query: {}", config.pagination.max_pages);

    println!("\nPoliteness:");
    println!(
        "  Between queries: {:.0}-{:.0}s",
        config.politeness.query_delay_min_secs, config.politeness.query_delay_max_secs
    );
    println!(
        "  Between actions: {:.0}-{:.0}s",
        config.politeness.action_delay_min_secs, config.politeness.action_delay_max_secs
    );

    println!("\nOutput:");
    println!("  Results: {}", config.output.results_dir);
    println!("  Progress: {}", config.output.progress_path);
    if config.downloads.enabled {
        println!("  Assets: {}", config.downloads.asset_dir);
    } else {
        println!("  Assets: disabled");
    }

    let mut queries = load_queries(Path::new(&config.input.queries_path))?;
    if let Some(n) = start_from {
        queries = filter_start_from(queries, n);
    }

    let progress = if fresh {
        Default::default()
    } else {
        ProgressStore::load(Path::new(&config.output.progress_path))?
    };
    let pending: Vec<_> = queries
        .iter()
        .filter(|q| !progress.is_completed(&q.id))
        .collect();

    println!(
        "\nQueries ({} pending, {} already completed):",
        pending.len(),
        queries.len() - pending.len()
    );
    for query in &pending {
        println!("  - #{}: {}", query.id, query.text);
        println!("    {}", build_query_url(&config.source, &query.text)?);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would run {} queries", pending.len());

    Ok(())
}

/// Handles the --status mode: reports what earlier runs left on disk
fn handle_status(config: &Config) -> anyhow::Result<()> {
    println!("Progress: {}\n", config.output.progress_path);
    let report = gather_status(config)?;
    print_status(&report);
    Ok(())
}

/// Handles the main harvest run
async fn handle_harvest(config: Config, options: RunOptions) -> anyhow::Result<()> {
    if options.fresh {
        tracing::info!("Starting fresh run (ignoring previous progress)");
    } else {
        tracing::info!("Starting run (completed queries will be skipped)");
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            trigger.cancel();
        }
    });

    match run_harvest(config, options, cancel).await {
        Ok(summary) if summary.interrupted => {
            tracing::warn!(
                "Run interrupted: {} queries completed this run; rerun to continue",
                summary.completed
            );
            Ok(())
        }
        Ok(_) => {
            tracing::info!("Harvest completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
