//! Checkpoint module for resumable runs
//!
//! This module records which source URLs have been processed and with what
//! outcome. Two backends are provided:
//! - a JSON file rewritten atomically after every page (default)
//! - an embedded SQLite table
//!
//! Both are loaded in full at startup; a checkpoint that cannot be read is a
//! fatal startup error rather than an empty run.

mod json;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonCheckpoint;
pub use sqlite::SqliteCheckpoint;
pub use traits::{CheckpointError, CheckpointResult, CheckpointStore};

use crate::config::{CheckpointBackend, CheckpointConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome recorded for a source URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointStatus {
    /// Stored successfully; never processed again
    Done,
    /// Definitively failed on the last attempt; retried on the next run
    Failed,
}

impl CheckpointStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A single checkpoint record
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointEntry {
    pub source_url: String,
    pub status: CheckpointStatus,
    pub timestamp: DateTime<Utc>,
    /// Failure reason, when status is Failed
    pub detail: Option<String>,
}

impl CheckpointEntry {
    pub fn done(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            status: CheckpointStatus::Done,
            timestamp: Utc::now(),
            detail: None,
        }
    }

    pub fn failed(source_url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            status: CheckpointStatus::Failed,
            timestamp: Utc::now(),
            detail: Some(detail.into()),
        }
    }
}

/// Opens the configured checkpoint backend, creating it if absent
///
/// # Returns
///
/// * `Ok(Box<dyn CheckpointStore>)` - Store loaded with all prior entries
/// * `Err(CheckpointError)` - The checkpoint exists but cannot be read
pub fn open_store(config: &CheckpointConfig) -> CheckpointResult<Box<dyn CheckpointStore>> {
    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| CheckpointError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }

    let store: Box<dyn CheckpointStore> = match config.backend {
        CheckpointBackend::Json => Box::new(JsonCheckpoint::open(&config.path)?),
        CheckpointBackend::Sqlite => Box::new(SqliteCheckpoint::open(&config.path)?),
    };

    tracing::info!(
        "Loaded {} checkpoint entries from {}",
        store.len(),
        config.path.display()
    );

    Ok(store)
}
