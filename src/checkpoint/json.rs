//! JSON flat-file checkpoint backend
//!
//! The whole mapping is rewritten on every record: serialized to a sibling
//! temp file, fsynced, then renamed over the checkpoint. A crash at any point
//! leaves either the old or the new file, never a partial one.

use crate::checkpoint::traits::{CheckpointError, CheckpointResult, CheckpointStore};
use crate::checkpoint::{CheckpointEntry, CheckpointStatus};
use crate::output::write_atomic;
use crate::url::normalize_url;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk form of an entry; the source URL is the map key
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    status: CheckpointStatus,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// Accepted checkpoint file layouts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CheckpointFile {
    Current(BTreeMap<String, StoredEntry>),
    /// Older runs wrote a bare list of processed URLs
    Legacy(Vec<String>),
}

/// JSON checkpoint backend
pub struct JsonCheckpoint {
    path: PathBuf,
    entries: BTreeMap<String, CheckpointEntry>,
}

impl JsonCheckpoint {
    /// Opens the checkpoint at `path`, starting empty if the file is absent
    pub fn open(path: &Path) -> CheckpointResult<Self> {
        let entries = if path.exists() {
            load_entries(path)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    fn flush(&self, entries: &BTreeMap<String, CheckpointEntry>) -> CheckpointResult<()> {
        let stored: BTreeMap<&str, StoredEntry> = entries
            .iter()
            .map(|(url, entry)| {
                (
                    url.as_str(),
                    StoredEntry {
                        status: entry.status,
                        timestamp: entry.timestamp,
                        detail: entry.detail.clone(),
                    },
                )
            })
            .collect();

        let body = serde_json::to_vec_pretty(&stored)?;
        write_atomic(&self.path, &body).map_err(|source| CheckpointError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl CheckpointStore for JsonCheckpoint {
    fn get(&self, source_url: &str) -> Option<&CheckpointEntry> {
        self.entries.get(source_url)
    }

    fn record(&mut self, entry: CheckpointEntry) -> CheckpointResult<()> {
        let mut next = self.entries.clone();
        next.insert(entry.source_url.clone(), entry);
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }

    fn entries(&self) -> Vec<&CheckpointEntry> {
        self.entries.values().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn load_entries(path: &Path) -> CheckpointResult<BTreeMap<String, CheckpointEntry>> {
    let raw = fs::read_to_string(path).map_err(|source| CheckpointError::Io {
        path: path.display().to_string(),
        source,
    })?;

    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let parsed: CheckpointFile =
        serde_json::from_str(&raw).map_err(|e| CheckpointError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let entries = match parsed {
        CheckpointFile::Current(map) => map
            .into_iter()
            .map(|(url, stored)| {
                let entry = CheckpointEntry {
                    source_url: url.clone(),
                    status: stored.status,
                    timestamp: stored.timestamp,
                    detail: stored.detail,
                };
                (url, entry)
            })
            .collect(),
        CheckpointFile::Legacy(urls) => {
            tracing::info!(
                "Upgrading legacy checkpoint {} ({} URLs)",
                path.display(),
                urls.len()
            );
            // Legacy lists hold raw index spellings; keys must match candidate identity
            let now = Utc::now();
            urls.into_iter()
                .filter_map(|raw| match normalize_url(&raw) {
                    Ok(url) => Some(url.to_string()),
                    Err(e) => {
                        tracing::warn!("Dropping legacy checkpoint entry '{}': {}", raw, e);
                        None
                    }
                })
                .map(|url| {
                    let entry = CheckpointEntry {
                        source_url: url.clone(),
                        status: CheckpointStatus::Done,
                        timestamp: now,
                        detail: None,
                    };
                    (url, entry)
                })
                .collect()
        }
    };

    Ok(entries)
}
