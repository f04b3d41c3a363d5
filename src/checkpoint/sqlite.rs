//! SQLite checkpoint backend
//!
//! This module provides a SQLite-based implementation of the CheckpointStore trait.

use crate::checkpoint::schema::initialize_schema;
use crate::checkpoint::traits::{CheckpointError, CheckpointResult, CheckpointStore};
use crate::checkpoint::{CheckpointEntry, CheckpointStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite checkpoint backend
pub struct SqliteCheckpoint {
    conn: Connection,
    entries: BTreeMap<String, CheckpointEntry>,
}

impl SqliteCheckpoint {
    /// Opens or creates the checkpoint database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCheckpoint)` - Database opened and all entries loaded
    /// * `Err(CheckpointError)` - Database unreadable or holds unknown statuses
    pub fn open(path: &Path) -> CheckpointResult<Self> {
        let conn = Connection::open(path)?;

        // Every commit must reach disk before the page counts as done
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
        ",
        )?;

        Self::from_connection(conn, &path.display().to_string())
    }

    /// Creates an in-memory checkpoint (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> CheckpointResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, ":memory:")
    }

    fn from_connection(conn: Connection, location: &str) -> CheckpointResult<Self> {
        initialize_schema(&conn)?;
        let entries = load_entries(&conn, location)?;
        Ok(Self { conn, entries })
    }
}

impl CheckpointStore for SqliteCheckpoint {
    fn get(&self, source_url: &str) -> Option<&CheckpointEntry> {
        self.entries.get(source_url)
    }

    fn record(&mut self, entry: CheckpointEntry) -> CheckpointResult<()> {
        self.conn.execute(
            "INSERT INTO checkpoints (source_url, status, recorded_at, detail)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source_url) DO UPDATE SET
                status = excluded.status,
                recorded_at = excluded.recorded_at,
                detail = excluded.detail",
            params![
                entry.source_url,
                entry.status.to_db_string(),
                entry.timestamp.to_rfc3339(),
                entry.detail,
            ],
        )?;

        self.entries.insert(entry.source_url.clone(), entry);
        Ok(())
    }

    fn entries(&self) -> Vec<&CheckpointEntry> {
        self.entries.values().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn load_entries(
    conn: &Connection,
    location: &str,
) -> CheckpointResult<BTreeMap<String, CheckpointEntry>> {
    let mut stmt =
        conn.prepare("SELECT source_url, status, recorded_at, detail FROM checkpoints")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut entries = BTreeMap::new();
    for row in rows {
        let (source_url, status, recorded_at, detail) = row?;

        let status =
            CheckpointStatus::from_db_string(&status).ok_or_else(|| CheckpointError::Corrupt {
                path: location.to_string(),
                message: format!("unknown status '{}' for {}", status, source_url),
            })?;

        let timestamp = DateTime::parse_from_rfc3339(&recorded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CheckpointError::Corrupt {
                path: location.to_string(),
                message: format!("bad timestamp '{}' for {}: {}", recorded_at, source_url, e),
            })?;

        entries.insert(
            source_url.clone(),
            CheckpointEntry {
                source_url,
                status,
                timestamp,
                detail,
            },
        );
    }

    Ok(entries)
}
