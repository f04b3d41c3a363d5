//! Database schema for the SQLite checkpoint backend

/// SQL schema for the checkpoint database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS checkpoints (
    source_url TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_checkpoints_status ON checkpoints(status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
