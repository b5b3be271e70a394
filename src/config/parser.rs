use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use query_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Results go to: {}", config.output.results_dir);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at the start of every run so the progress and result files can be
/// traced back to the configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const MINIMAL: &str = r#"
[input]
queries-path = "queries.csv"

[source]
base-url = "https://search.example.org/results"

[output]
results-dir = "./results"
progress-path = "./progress.json"
"#;

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let file = create_temp_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.input.queries_path, "queries.csv");
        assert_eq!(config.source.query_param, "queryText");
        assert_eq!(
            config.source.extra_params.get("newsearch").map(String::as_str),
            Some("true")
        );
        assert_eq!(config.pagination.max_pages, 5);
        assert_eq!(config.pagination.scroll_attempts, 3);
        assert_eq!(config.politeness.query_delay_min_secs, 60.0);
        assert_eq!(config.politeness.query_delay_max_secs, 120.0);
        assert_eq!(config.politeness.action_delay_min_secs, 3.0);
        assert_eq!(config.politeness.action_delay_max_secs, 8.0);
        assert!(config.downloads.enabled);
        assert_eq!(config.downloads.min_asset_bytes, 1000);
        assert_eq!(config.downloads.signature, "%PDF");
        assert_eq!(config.selectors.result_item, ".result-item");
    }

    #[test]
    fn test_load_config_with_overrides() {
        let content = format!(
            "{}\n{}",
            MINIMAL,
            r#"
[politeness]
query-delay-min-secs = 1.5
query-delay-max-secs = 2.0

[pagination]
max-pages = 2

[downloads]
enabled = false

[selectors]
title = ["h2.title"]
"#
        );
        let file = create_temp_config(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.politeness.query_delay_min_secs, 1.5);
        assert_eq!(config.politeness.action_delay_max_secs, 8.0);
        assert_eq!(config.pagination.max_pages, 2);
        assert!(!config.downloads.enabled);
        assert_eq!(config.selectors.title, vec!["h2.title".to_string()]);
        // Untouched selectors keep their defaults
        assert_eq!(config.selectors.results_list, ".List-results-items");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = format!("{}\n[pagination]\nmax-pages = 0\n", MINIMAL);
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_load_config_with_hash() {
        let file = create_temp_config(MINIMAL);
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.output.progress_path, "./progress.json");
        assert_eq!(hash.len(), 64);
    }
}
