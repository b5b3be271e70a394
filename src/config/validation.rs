use crate::config::types::{
    Config, DownloadConfig, InputConfig, OutputConfig, PaginationConfig, PolitenessConfig,
    SelectorConfig, SourceConfig, MAX_DELAY_SECS,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_input_config(&config.input)?;
    validate_source_config(&config.source)?;
    validate_politeness_config(&config.politeness)?;
    validate_pagination_config(&config.pagination)?;
    validate_download_config(&config.downloads)?;
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.queries_path.is_empty() {
        return Err(ConfigError::Validation(
            "queries_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.query_param.is_empty() {
        return Err(ConfigError::Validation(
            "query_param cannot be empty".to_string(),
        ));
    }

    if config.page_load_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "page_load_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    validate_window(
        "query delay",
        config.query_delay_min_secs,
        config.query_delay_max_secs,
    )?;
    validate_window(
        "action delay",
        config.action_delay_min_secs,
        config.action_delay_max_secs,
    )
}

fn validate_window(name: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} window must be finite and non-negative, got {}..{}",
            name, min, max
        )));
    }

    if min > max {
        return Err(ConfigError::Validation(format!(
            "{} minimum ({}) exceeds maximum ({})",
            name, min, max
        )));
    }

    if max > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "{} maximum ({}) exceeds {} seconds",
            name, max, MAX_DELAY_SECS
        )));
    }

    Ok(())
}

fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }
    Ok(())
}

fn validate_download_config(config: &DownloadConfig) -> Result<(), ConfigError> {
    if config.asset_dir.is_empty() {
        return Err(ConfigError::Validation(
            "asset_dir cannot be empty".to_string(),
        ));
    }

    if config.signature.is_empty() {
        return Err(ConfigError::Validation(
            "signature cannot be empty".to_string(),
        ));
    }

    if config.filename_chars == 0 || config.title_chars == 0 {
        return Err(ConfigError::Validation(
            "filename_chars and title_chars must be >= 1".to_string(),
        ));
    }

    if config.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.results_dir.is_empty() {
        return Err(ConfigError::Validation(
            "results_dir cannot be empty".to_string(),
        ));
    }

    if config.progress_path.is_empty() {
        return Err(ConfigError::Validation(
            "progress_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every selector parses as CSS and the asset pattern compiles
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.results_summary,
        &config.results_list,
        &config.result_item,
        &config.asset_frame,
    ] {
        validate_selector(selector)?;
    }

    for (name, list) in [
        ("title", &config.title),
        ("link", &config.link),
        ("authors", &config.authors),
        ("publication", &config.publication),
        ("year", &config.year),
        ("abstract", &config.abstract_text),
        ("next-page", &config.next_page),
        ("viewer-link", &config.viewer_link),
    ] {
        if list.is_empty() {
            return Err(ConfigError::InvalidSelector(format!(
                "selector list '{}' must contain at least one selector",
                name
            )));
        }
        for selector in list {
            validate_selector(selector)?;
        }
    }

    Regex::new(&config.asset_url_pattern).map_err(|e| {
        ConfigError::InvalidSelector(format!(
            "asset_url_pattern '{}' does not compile: {}",
            config.asset_url_pattern, e
        ))
    })?;

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
