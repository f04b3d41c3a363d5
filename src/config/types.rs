use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default Wayback CDX endpoint
pub const DEFAULT_CDX_API_URL: &str = "http://web.archive.org/cdx/search/cdx";

/// Default Wayback replay base
pub const DEFAULT_WAYBACK_BASE_URL: &str = "https://web.archive.org/web/";

/// Default Memento TimeTravel JSON endpoint
pub const DEFAULT_MEMENTO_API_URL: &str = "http://timetravel.mementoweb.org/api/json/";

/// Main configuration structure for Wayback-Salvage
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub requests: RequestConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

/// Which domain to harvest and which archive services to use
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Domain pattern (e.g., "example.org" or "*.example.org")
    #[serde(rename = "target-domain")]
    pub target_domain: String,

    /// CDX index endpoint used for enumeration and per-URL capture lists
    #[serde(rename = "cdx-api-url", default = "default_cdx_api_url")]
    pub cdx_api_url: String,

    /// Replay base; captures are addressed as `{base}{timestamp}id_/{url}`
    #[serde(rename = "wayback-base-url", default = "default_wayback_base_url")]
    pub wayback_base_url: String,

    /// Memento TimeTravel endpoint used as the fallback discovery service
    #[serde(rename = "memento-api-url", default = "default_memento_api_url")]
    pub memento_api_url: String,
}

/// Request pacing, retry and timeout settings
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    /// Delay between retries and between consecutive pages (milliseconds)
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Total number of attempts per request
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Timeout for index and discovery queries (milliseconds)
    #[serde(rename = "api-timeout-ms", default = "default_api_timeout_ms")]
    pub api_timeout_ms: u64,

    /// Timeout for capture and asset downloads (milliseconds)
    #[serde(rename = "content-timeout-ms", default = "default_content_timeout_ms")]
    pub content_timeout_ms: u64,
}

impl RequestConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            max_retries: default_max_retries(),
            api_timeout_ms: default_api_timeout_ms(),
            content_timeout_ms: default_content_timeout_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the harvester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the harvester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for harvester-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Main-content extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// CSS selectors tried in order; the first non-empty match wins
    #[serde(default = "default_selectors")]
    pub selectors: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            selectors: default_selectors(),
        }
    }
}

/// Where downloaded assets are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AssetLayout {
    /// `_assets/` next to each page's document
    #[default]
    PerPage,
    /// One `_assets/` directory at the root of the output tree
    Shared,
}

/// Asset download toggles
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AssetConfig {
    #[serde(rename = "download-css", default)]
    pub download_css: bool,

    #[serde(rename = "download-images", default)]
    pub download_images: bool,

    #[serde(rename = "download-scripts", default)]
    pub download_scripts: bool,

    #[serde(default)]
    pub layout: AssetLayout,
}

impl AssetConfig {
    /// Returns true if at least one asset class is enabled
    pub fn any_enabled(&self) -> bool {
        self.download_css || self.download_images || self.download_scripts
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root of the generated document tree
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Also store the fetched HTML beside the Markdown document
    #[serde(rename = "save-original-html", default)]
    pub save_original_html: bool,

    /// Point asset references at the downloaded local copies
    #[serde(rename = "rewrite-asset-links", default = "default_true")]
    pub rewrite_asset_links: bool,

    /// Optional log file (appended to, in addition to the console)
    #[serde(rename = "log-file", default)]
    pub log_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            save_original_html: false,
            rewrite_asset_links: true,
            log_file: None,
        }
    }
}

/// Checkpoint storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    /// Whole-map JSON file rewritten atomically after every page
    #[default]
    Json,
    /// Embedded SQLite table
    Sqlite,
}

/// Checkpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,

    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            path: default_checkpoint_path(),
        }
    }
}

fn default_cdx_api_url() -> String {
    DEFAULT_CDX_API_URL.to_string()
}

fn default_wayback_base_url() -> String {
    DEFAULT_WAYBACK_BASE_URL.to_string()
}

fn default_memento_api_url() -> String {
    DEFAULT_MEMENTO_API_URL.to_string()
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_api_timeout_ms() -> u64 {
    30_000
}

fn default_content_timeout_ms() -> u64 {
    60_000
}

fn default_selectors() -> Vec<String> {
    vec![
        "main".to_string(),
        "article".to_string(),
        "#content".to_string(),
        "body".to_string(),
    ]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("processed_urls.json")
}

fn default_true() -> bool {
    true
}
