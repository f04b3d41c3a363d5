//! Statistics generation from the checkpoint
//!
//! This module provides functionality for extracting and displaying
//! progress statistics from a checkpoint store.

use crate::checkpoint::{CheckpointStatus, CheckpointStore};
use chrono::{DateTime, Utc};

/// Progress recorded in a checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointStatistics {
    /// Total number of recorded URLs
    pub total: usize,

    /// URLs stored successfully
    pub done: usize,

    /// URLs whose last attempt failed
    pub failed: usize,

    /// Failed URLs with their recorded reason
    pub failed_urls: Vec<(String, Option<String>)>,

    /// Time of the most recent record
    pub last_recorded: Option<DateTime<Utc>>,
}

/// Loads statistics from a checkpoint store
pub fn load_statistics(store: &dyn CheckpointStore) -> CheckpointStatistics {
    let entries = store.entries();

    let failed_urls: Vec<(String, Option<String>)> = entries
        .iter()
        .filter(|e| e.status == CheckpointStatus::Failed)
        .map(|e| (e.source_url.clone(), e.detail.clone()))
        .collect();

    CheckpointStatistics {
        total: entries.len(),
        done: store.count_by_status(CheckpointStatus::Done),
        failed: failed_urls.len(),
        failed_urls,
        last_recorded: entries.iter().map(|e| e.timestamp).max(),
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CheckpointStatistics) {
    println!("=== Checkpoint Statistics ===\n");

    println!("Overview:");
    println!("  Recorded URLs: {}", stats.total);
    if let Some(last) = stats.last_recorded {
        println!("  Last update: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();

    println!("URLs by Status:");
    for (label, count) in [("Done", stats.done), ("Failed", stats.failed)] {
        let percentage = if stats.total > 0 {
            (count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if !stats.failed_urls.is_empty() {
        println!("Failed URLs ({}):", stats.failed_urls.len());
        for (url, detail) in &stats.failed_urls {
            match detail {
                Some(reason) => println!("  - {} ({})", url, reason),
                None => println!("  - {}", url),
            }
        }
        println!();
    }
}
