//! Wayback-Salvage: a resumable web-archive harvester
//!
//! This crate recovers the archived pages of a domain from a public web
//! archive, extracts their main content, converts it to Markdown and stores it
//! (with optional assets) in a local directory tree. Progress is checkpointed
//! after every page so interrupted runs resume where they stopped.

pub mod archive;
pub mod checkpoint;
pub mod config;
pub mod content;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

pub use archive::FetchError;
pub use checkpoint::CheckpointError;

/// Main error type for Wayback-Salvage operations
#[derive(Debug, Error)]
pub enum SalvageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No usable snapshot for {url} (primary: {primary}; fallback: {fallback})")]
    NoSnapshotAvailable {
        url: String,
        primary: String,
        fallback: String,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Asset {url} could not be fetched: {source}")]
    AssetFetch { url: String, source: FetchError },

    #[error("Failed to write {path}: {source}")]
    Persistence {
        path: String,
        source: std::io::Error,
    },

    #[error("Checkpoint write failed: {0}")]
    CheckpointWrite(#[from] CheckpointError),

    #[error("Archive index returned an unusable response for {url}: {message}")]
    IndexResponse { url: String, message: String },

    #[error("Capture of {url} is not an HTML document")]
    NotHtml { url: String },

    #[error("Invalid stage transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageStage,
        to: state::PageStage,
    },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SalvageError {
    /// Returns true if the error must stop the whole run
    ///
    /// Only a failure to durably record progress is fatal; everything else is
    /// local to the page being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CheckpointWrite(_))
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

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid content selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Wayback-Salvage operations
pub type Result<T> = std::result::Result<T, SalvageError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use archive::{run_archive, RunDriver, RunSummary};
pub use config::Config;
pub use state::PageStage;
pub use crate::url::{matches_domain, normalize_url};
