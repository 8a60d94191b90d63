use serde::Deserialize;

/// Main configuration structure for Post-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

/// Which site to crawl and how to classify its URLs
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Base domain, either a bare host or a full origin
    pub domain: String,

    /// Start URLs for a fresh crawl
    pub seeds: Vec<String>,

    /// Pattern for pages content is extracted from
    #[serde(rename = "target-pattern")]
    pub target_pattern: String,

    /// Pattern every crawlable URL must match
    #[serde(rename = "all-pattern")]
    pub all_pattern: String,

    /// Pattern for URLs that must never be crawled
    #[serde(rename = "exclude-pattern", default)]
    pub exclude_pattern: Option<String>,

    /// Query parameters stripped before any comparison
    #[serde(rename = "excluded-params", default)]
    pub excluded_params: Vec<String>,

    /// Seconds between frontier checkpoints
    #[serde(
        rename = "checkpoint-interval-secs",
        default = "default_checkpoint_interval"
    )]
    pub checkpoint_interval_secs: u64,
}

/// HTTP client and retry policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// First backoff delay after a transient failure
    #[serde(rename = "initial-backoff-secs", default = "default_initial_backoff")]
    pub initial_backoff_secs: f64,

    /// Factor applied to the delay after every transient failure
    #[serde(rename = "backoff-multiplier", default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Ceiling for the delay; 0 disables the ceiling
    #[serde(rename = "max-backoff-secs", default = "default_max_backoff")]
    pub max_backoff_secs: f64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            initial_backoff_secs: default_initial_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

/// Where the stored fields live inside a target page
///
/// Tags and selectors are joined into one CSS selector (`tag` + `selector`).
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    #[serde(rename = "body-tag", default = "default_body_tag")]
    pub body_tag: String,

    #[serde(rename = "body-selector", default = "default_body_selector")]
    pub body_selector: String,

    /// Descendant tag whose text makes up the body; empty for the element text
    #[serde(rename = "body-inner-tag", default = "default_body_inner_tag")]
    pub body_inner_tag: Option<String>,

    #[serde(rename = "label-tag", default = "default_label_tag")]
    pub label_tag: String,

    #[serde(rename = "label-selector", default = "default_label_selector")]
    pub label_selector: String,

    #[serde(rename = "label-inner-tag", default)]
    pub label_inner_tag: Option<String>,

    /// Selector of the element carrying the record identifier
    #[serde(rename = "id-selector", default = "default_id_selector")]
    pub id_selector: String,

    /// Attribute holding the identifier
    #[serde(rename = "id-attribute", default = "default_id_attribute")]
    pub id_attribute: String,

    /// Keep a compressed copy of every target page
    #[serde(rename = "store-raw", default = "default_store_raw")]
    pub store_raw: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            body_tag: default_body_tag(),
            body_selector: default_body_selector(),
            body_inner_tag: default_body_inner_tag(),
            label_tag: default_label_tag(),
            label_selector: default_label_selector(),
            label_inner_tag: None,
            id_selector: default_id_selector(),
            id_attribute: default_id_attribute(),
            store_raw: default_store_raw(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the frontier checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Directory (or SQLite file) holding extracted content
    #[serde(rename = "content-dir")]
    pub content_dir: String,

    #[serde(default)]
    pub backend: StoreBackend,
}

/// Content store implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One record file per identifier
    #[default]
    Files,
    /// One row per identifier in a SQLite database
    Sqlite,
}

fn default_checkpoint_interval() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("post-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

fn default_initial_backoff() -> f64 {
    5.0
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_backoff() -> f64 {
    300.0
}

fn default_body_tag() -> String {
    "div".to_string()
}

fn default_body_selector() -> String {
    ".text-neutral-content".to_string()
}

fn default_body_inner_tag() -> Option<String> {
    Some("p".to_string())
}

fn default_label_tag() -> String {
    "*".to_string()
}

fn default_label_selector() -> String {
    r#"[slot="post-flair"]"#.to_string()
}

fn default_id_selector() -> String {
    "shreddit-post".to_string()
}

fn default_id_attribute() -> String {
    "id".to_string()
}

fn default_store_raw() -> bool {
    true
}
