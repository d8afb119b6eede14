//! SQLite schema for listening history

use crate::error::Result;
use rusqlite::Connection;

/// Initialize the database schema
///
/// Safe to call on every connection; all statements are idempotent.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    // One row per distinct file fingerprint, ever
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS imports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            imported_at TEXT NOT NULL,
            export_root TEXT NOT NULL,
            file_path TEXT NOT NULL,
            file_hash TEXT NOT NULL UNIQUE,
            rows_inserted INTEGER NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            played_at_utc TEXT NOT NULL,
            played_at_local TEXT NOT NULL,
            track_name TEXT,
            artist_name TEXT,
            album_name TEXT,
            ms_played INTEGER NOT NULL CHECK (ms_played > 0),
            platform TEXT,
            content_type TEXT CHECK (content_type IN ('music', 'podcast')),
            source_file_hash TEXT NOT NULL,
            raw_source TEXT NOT NULL
                CHECK (raw_source IN ('streaming_history_old', 'streaming_history_new')),

            FOREIGN KEY(source_file_hash) REFERENCES imports(file_hash)
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_played_at_utc ON events(played_at_utc)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_artist ON events(artist_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_source_hash ON events(source_file_hash)",
        [],
    )?;

    Ok(())
}
