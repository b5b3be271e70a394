use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Query-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub downloads: DownloadConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Query input configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the CSV file with `id` and `text` columns
    #[serde(rename = "queries-path")]
    pub queries_path: String,
}

/// Search source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Search endpoint the query text is appended to
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Name of the query-string parameter carrying the query text
    #[serde(rename = "query-param", default = "default_query_param")]
    pub query_param: String,

    /// Additional fixed query-string parameters
    #[serde(rename = "extra-params", default = "default_extra_params")]
    pub extra_params: BTreeMap<String, String>,

    /// User agent presented by the session and the asset fetcher
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "page-load-timeout-secs", default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// Bound on waiting for the results-summary element
    #[serde(rename = "summary-wait-secs", default = "default_summary_wait")]
    pub summary_wait_secs: u64,

    /// Bound on waiting for the results list on each page
    #[serde(rename = "results-wait-secs", default = "default_results_wait")]
    pub results_wait_secs: u64,
}

impl SourceConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn summary_wait(&self) -> Duration {
        Duration::from_secs(self.summary_wait_secs)
    }

    pub fn results_wait(&self) -> Duration {
        Duration::from_secs(self.results_wait_secs)
    }
}

/// Longest delay a politeness window may ask for: one day
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Randomized delay windows, in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Lower bound of the delay between queries
    #[serde(rename = "query-delay-min-secs", default = "default_query_delay_min")]
    pub query_delay_min_secs: f64,

    /// Upper bound of the delay between queries
    #[serde(rename = "query-delay-max-secs", default = "default_query_delay_max")]
    pub query_delay_max_secs: f64,

    /// Lower bound of the delay between page-level actions
    #[serde(rename = "action-delay-min-secs", default = "default_action_delay_min")]
    pub action_delay_min_secs: f64,

    /// Upper bound of the delay between page-level actions
    #[serde(rename = "action-delay-max-secs", default = "default_action_delay_max")]
    pub action_delay_max_secs: f64,

    /// Pause after each scroll cycle (milliseconds)
    #[serde(rename = "scroll-settle-ms", default = "default_scroll_settle")]
    pub scroll_settle_ms: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            query_delay_min_secs: default_query_delay_min(),
            query_delay_max_secs: default_query_delay_max(),
            action_delay_min_secs: default_action_delay_min(),
            action_delay_max_secs: default_action_delay_max(),
            scroll_settle_ms: default_scroll_settle(),
        }
    }
}

/// Pagination limits
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Maximum number of result pages read per query
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum scroll-and-settle cycles before reading a page
    #[serde(rename = "scroll-attempts", default = "default_scroll_attempts")]
    pub scroll_attempts: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            scroll_attempts: default_scroll_attempts(),
        }
    }
}

/// Asset download configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory the asset files are stored in
    #[serde(rename = "asset-dir", default = "default_asset_dir")]
    pub asset_dir: String,

    /// Files at or below this size are not considered valid assets
    #[serde(rename = "min-asset-bytes", default = "default_min_asset_bytes")]
    pub min_asset_bytes: u64,

    /// Leading bytes every accepted asset must start with
    #[serde(default = "default_signature")]
    pub signature: String,

    /// File extension of stored assets (without the dot)
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Number of title characters used in asset filenames
    #[serde(rename = "title-chars", default = "default_title_chars")]
    pub title_chars: usize,

    /// Cap on the asset filename stem length
    #[serde(rename = "filename-chars", default = "default_filename_chars")]
    pub filename_chars: usize,
}

impl DownloadConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            asset_dir: default_asset_dir(),
            min_asset_bytes: default_min_asset_bytes(),
            signature: default_signature(),
            extension: default_extension(),
            fetch_timeout_secs: default_fetch_timeout(),
            title_chars: default_title_chars(),
            filename_chars: default_filename_chars(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding one result file per query
    #[serde(rename = "results-dir")]
    pub results_dir: String,

    /// Path to the JSON progress file
    #[serde(rename = "progress-path")]
    pub progress_path: String,
}

/// Site-coupled CSS selectors and patterns
///
/// Every list is an ordered priority list: the first entry that yields a
/// non-empty value wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    pub results_summary: String,
    pub results_list: String,
    pub result_item: String,
    pub title: Vec<String>,
    pub link: Vec<String>,
    pub authors: Vec<String>,
    pub publication: Vec<String>,
    pub year: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Vec<String>,
    pub next_page: Vec<String>,
    pub viewer_link: Vec<String>,
    pub asset_frame: String,
    pub asset_url_marker: String,
    pub asset_url_pattern: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            results_summary: ".Dashboard-statistics".to_string(),
            results_list: ".List-results-items".to_string(),
            result_item: ".result-item".to_string(),
            title: strings(&["h3 a", ".result-item-title"]),
            link: strings(&["h3 a", ".result-item-title a"]),
            authors: strings(&[".author"]),
            publication: strings(&[".publisher-info-container"]),
            year: strings(&[".detail-info-year"]),
            abstract_text: strings(&[".description"]),
            next_page: strings(&[
                "button[aria-label='Next page']",
                "a.next-page",
                ".pagination .next",
                ".pagination li:last-child a",
            ]),
            viewer_link: strings(&["a[href*='stamp.jsp']", "[class*='pdf']"]),
            asset_frame: "iframe[src]".to_string(),
            asset_url_marker: "getPDF.jsp".to_string(),
            asset_url_pattern: r#"https?://[^"']*?getPDF\.jsp[^"'\s<>]*"#.to_string(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn default_query_param() -> String {
    "queryText".to_string()
}

fn default_extra_params() -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("newsearch".to_string(), "true".to_string());
    params
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_page_load_timeout() -> u64 {
    30
}

fn default_summary_wait() -> u64 {
    20
}

fn default_results_wait() -> u64 {
    10
}

fn default_query_delay_min() -> f64 {
    60.0
}

fn default_query_delay_max() -> f64 {
    120.0
}

fn default_action_delay_min() -> f64 {
    3.0
}

fn default_action_delay_max() -> f64 {
    8.0
}

fn default_scroll_settle() -> u64 {
    2000
}

fn default_max_pages() -> u32 {
    5
}

fn default_scroll_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_asset_dir() -> String {
    "assets".to_string()
}

fn default_min_asset_bytes() -> u64 {
    1000
}

fn default_signature() -> String {
    "%PDF".to_string()
}

fn default_extension() -> String {
    "pdf".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_title_chars() -> usize {
    50
}

fn default_filename_chars() -> usize {
    100
}
