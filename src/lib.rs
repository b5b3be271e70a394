//! Query-Harvest: a polite, resumable search-and-retrieve orchestrator
//!
//! This crate drives a list of search queries against a rate-sensitive source,
//! walks each query's paginated result list, resolves and downloads the asset
//! behind every discovered item, and records progress so an interrupted run
//! picks up where it stopped.

pub mod config;
pub mod crawler;
pub mod input;
pub mod output;
pub mod renderer;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Query-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Timed out: {operation}")]
    Timeout { operation: String },

    #[error("Element not found: {what}")]
    ElementNotFound { what: String },

    #[error("Asset rejected: {reason}")]
    AssetRejected { reason: String },

    #[error("Failed to persist {path}: {message}")]
    Persistence { path: String, message: String },

    #[error("Interrupted")]
    Interrupted,

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl HarvestError {
    /// Maps a reqwest failure onto the taxonomy, keeping timeouts distinct
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                operation: format!("request to {}", url),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Query-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_harvest, Orchestrator, RunOptions, RunSummary};
pub use input::Query;
pub use state::{CrawlProgress, QueryState};
pub use storage::{ItemRecord, QueryResult};
