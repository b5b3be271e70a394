//! Configuration module for Query-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use query_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Reading at most {} pages per query", config.pagination.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DownloadConfig, InputConfig, OutputConfig, PaginationConfig, PolitenessConfig,
    SelectorConfig, SourceConfig, MAX_DELAY_SECS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

/// Configuration with zero delays rooted at `root`, for unit tests
#[cfg(test)]
pub(crate) fn test_config(base_url: &str, root: &std::path::Path) -> Config {
    Config {
        input: InputConfig {
            queries_path: root.join("queries.csv").to_string_lossy().into_owned(),
        },
        source: SourceConfig {
            base_url: base_url.to_string(),
            query_param: "queryText".to_string(),
            extra_params: Default::default(),
            user_agent: "query-harvest-test".to_string(),
            page_load_timeout_secs: 5,
            summary_wait_secs: 1,
            results_wait_secs: 1,
        },
        politeness: PolitenessConfig {
            query_delay_min_secs: 0.0,
            query_delay_max_secs: 0.0,
            action_delay_min_secs: 0.0,
            action_delay_max_secs: 0.0,
            scroll_settle_ms: 0,
        },
        pagination: PaginationConfig::default(),
        downloads: DownloadConfig {
            asset_dir: root.join("assets").to_string_lossy().into_owned(),
            min_asset_bytes: 16,
            ..DownloadConfig::default()
        },
        output: OutputConfig {
            results_dir: root.join("results").to_string_lossy().into_owned(),
            progress_path: root.join("progress.json").to_string_lossy().into_owned(),
        },
        selectors: SelectorConfig::default(),
    }
}
