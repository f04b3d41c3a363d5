//! Checkpoint traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::checkpoint::{CheckpointEntry, CheckpointStatus};
use thiserror::Error;

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Checkpoint {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Trait for checkpoint backend implementations
///
/// A backend holds the full mapping in memory for lookups and persists every
/// `record` before returning. The in-memory view changes only after the
/// durable write succeeded, so a failed write leaves the store unchanged.
pub trait CheckpointStore: Send {
    /// Gets the entry for a normalized source URL
    fn get(&self, source_url: &str) -> Option<&CheckpointEntry>;

    /// Inserts or replaces the entry for `entry.source_url` and flushes it
    fn record(&mut self, entry: CheckpointEntry) -> CheckpointResult<()>;

    /// All entries, ordered by source URL
    fn entries(&self) -> Vec<&CheckpointEntry>;

    /// Number of recorded URLs
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the URL was completed by an earlier page run
    fn is_done(&self, source_url: &str) -> bool {
        self.get(source_url)
            .map(|entry| entry.status == CheckpointStatus::Done)
            .unwrap_or(false)
    }

    /// Counts entries with the given status
    fn count_by_status(&self, status: CheckpointStatus) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.status == status)
            .count()
    }
}
