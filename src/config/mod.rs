//! Configuration module for Wayback-Salvage
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use wayback_salvage::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Harvesting {}", config.archive.target_domain);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ArchiveConfig, AssetConfig, AssetLayout, CheckpointBackend, CheckpointConfig, Config,
    ContentConfig, OutputConfig, RequestConfig, UserAgentConfig, DEFAULT_CDX_API_URL,
    DEFAULT_MEMENTO_API_URL, DEFAULT_WAYBACK_BASE_URL,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
