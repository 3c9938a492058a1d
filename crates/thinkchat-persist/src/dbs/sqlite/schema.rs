use rusqlite::Connection;

use crate::error::Result;

// Each row keeps the full record as a JSON document; the typed columns
// exist for lookups and ordering.
const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS threads (
    id          TEXT PRIMARY KEY,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL,
    doc         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_threads_updated_at ON threads (updated_at DESC);

CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY,
    thread_id   TEXT NOT NULL REFERENCES threads (id),
    created_at  INTEGER NOT NULL,
    doc         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_thread_created ON messages (thread_id, created_at);
"#;

pub(crate) fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Latest timestamp handed out by a previous process, in milliseconds.
///
/// A thread's `updated_at` is never older than its own `created_at` or any
/// of its messages, so the threads table alone is enough.
pub(crate) fn latest_timestamp_ms(conn: &Connection) -> Result<i64> {
    let latest = conn.query_row("SELECT COALESCE(MAX(updated_at), 0) FROM threads", [], |row| {
        row.get(0)
    })?;
    Ok(latest)
}
