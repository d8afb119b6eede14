//! Durable storage for canonical events and import provenance
//!
//! Backed by a single SQLite file. The ingestion coordinator writes through
//! the [`EventStore`] trait; everything else reads from [`SqliteStore`]
//! directly.

pub mod schema;

use crate::error::{CliError, Result};
use crate::models::{to_iso_seconds, CanonicalEvent, EventProjection, ImportRecord};
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write-side operations the ingestion coordinator depends on
pub trait EventStore {
    /// Whether a file with this fingerprint was already imported
    fn record_exists(&self, file_hash: &str) -> Result<bool>;

    /// Persist a file's events and its provenance row as one atomic unit
    ///
    /// Either every row and the provenance entry become visible, or none do.
    /// A fingerprint that already has a provenance row is rejected with
    /// [`CliError::DuplicateImport`].
    fn insert_import_unit(&mut self, rows: &[CanonicalEvent], import: &ImportRecord) -> Result<()>;
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;

        debug!(path = %path.display(), journal_mode = %mode, "Opened listening history database");
        Ok(store)
    }

    /// Create an in-memory store (for tests and dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create tables and indexes if missing
    pub fn init_schema(&self) -> Result<()> {
        schema::init_schema(&self.conn)
    }

    /// Database file path, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored events
    pub fn count_events(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
    }

    /// Number of stored provenance rows
    pub fn count_imports(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM imports", [], |row| row.get(0))?)
    }

    /// All provenance rows, oldest first
    pub fn list_imports(&self) -> Result<Vec<ImportRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT imported_at, export_root, file_path, file_hash, rows_inserted
            FROM imports
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let imported_at: String = row.get(0)?;
            let imported_at = DateTime::parse_from_rfc3339(&imported_at)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?
                .with_timezone(&Utc);

            Ok(ImportRecord {
                imported_at,
                export_root: row.get(1)?,
                file_path: row.get(2)?,
                file_hash: row.get(3)?,
                rows_inserted: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CliError::corrupt_row(format!("imports: {}", e)))
    }

    /// Event columns needed for aggregation, in insertion order
    pub fn events_for_aggregation(&self) -> Result<Vec<EventProjection>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT played_at_local, track_name, artist_name, album_name,
                   ms_played, platform, content_type
            FROM events
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(EventProjection {
                played_at_local: row.get(0)?,
                track_name: row.get(1)?,
                artist_name: row.get(2)?,
                album_name: row.get(3)?,
                ms_played: row.get(4)?,
                platform: row.get(5)?,
                content_type: row.get(6)?,
            })
        })?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl EventStore for SqliteStore {
    fn record_exists(&self, file_hash: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM imports WHERE file_hash = ?1 LIMIT 1",
                [file_hash],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_import_unit(&mut self, rows: &[CanonicalEvent], import: &ImportRecord) -> Result<()> {
        // Dropping `tx` without commit rolls back
        let tx = self.conn.transaction()?;

        // Provenance first: a duplicate fingerprint fails before any event is written
        tx.execute(
            r#"
            INSERT INTO imports (imported_at, export_root, file_path, file_hash, rows_inserted)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                to_iso_seconds(&import.imported_at),
                import.export_root,
                import.file_path,
                import.file_hash,
                import.rows_inserted,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                CliError::DuplicateImport(import.file_hash.clone())
            } else {
                CliError::Store(e)
            }
        })?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO events (
                    played_at_utc, played_at_local,
                    track_name, artist_name, album_name,
                    ms_played, platform, content_type,
                    source_file_hash, raw_source
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;

            for row in rows {
                stmt.execute(params![
                    to_iso_seconds(&row.played_at_utc),
                    to_iso_seconds(&row.played_at_local),
                    row.track_name,
                    row.artist_name,
                    row.album_name,
                    row.ms_played,
                    row.platform,
                    row.content_type.as_str(),
                    import.file_hash,
                    row.raw_source.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{ContentType, RawSource};
    use chrono::TimeZone;

    fn event(ms: i64, artist: &str) -> CanonicalEvent {
        let utc = Utc.with_ymd_and_hms(2023, 5, 1, 8, 0, 0).unwrap();
        CanonicalEvent {
            played_at_utc: utc,
            played_at_local: utc.with_timezone(&chrono_tz::Europe::Paris).fixed_offset(),
            track_name: Some("Track".to_string()),
            artist_name: Some(artist.to_string()),
            album_name: None,
            ms_played: ms,
            platform: None,
            content_type: ContentType::Music,
            raw_source: RawSource::StreamingHistoryNew,
        }
    }

    fn import(hash: &str, rows: i64) -> ImportRecord {
        ImportRecord {
            imported_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            export_root: "/exports".to_string(),
            file_path: format!("/exports/{}.json", hash),
            file_hash: hash.to_string(),
            rows_inserted: rows,
        }
    }

    #[test]
    fn test_insert_import_unit() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.record_exists("abc").unwrap());

        store
            .insert_import_unit(&[event(1000, "A"), event(2000, "B")], &import("abc", 2))
            .unwrap();

        assert!(store.record_exists("abc").unwrap());
        assert_eq!(store.count_events().unwrap(), 2);
        assert_eq!(store.count_imports().unwrap(), 1);

        let imports = store.list_imports().unwrap();
        assert_eq!(imports, vec![import("abc", 2)]);
    }

    #[test]
    fn test_empty_unit_still_records_provenance() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_import_unit(&[], &import("empty", 0)).unwrap();

        assert!(store.record_exists("empty").unwrap());
        assert_eq!(store.count_events().unwrap(), 0);
        assert_eq!(store.count_imports().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_fingerprint_is_rejected_without_new_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_import_unit(&[event(1000, "A")], &import("abc", 1)).unwrap();

        let result = store.insert_import_unit(&[event(5000, "Z")], &import("abc", 1));
        assert!(matches!(result, Err(CliError::DuplicateImport(ref h)) if h == "abc"));

        assert_eq!(store.count_events().unwrap(), 1);
        assert_eq!(store.count_imports().unwrap(), 1);
    }

    #[test]
    fn test_failed_row_rolls_back_whole_unit() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        // The CHECK constraint rejects the second row after the first was written
        let result = store.insert_import_unit(&[event(1000, "A"), event(0, "B")], &import("abc", 2));
        assert!(matches!(result, Err(CliError::Store(_))));

        assert!(!store.record_exists("abc").unwrap());
        assert_eq!(store.count_events().unwrap(), 0);
        assert_eq!(store.count_imports().unwrap(), 0);
    }

    #[test]
    fn test_events_for_aggregation_preserves_insert_order() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_import_unit(&[event(1000, "First"), event(1000, "Second")], &import("a", 2))
            .unwrap();
        store.insert_import_unit(&[event(1000, "Third")], &import("b", 1)).unwrap();

        let rows = store.events_for_aggregation().unwrap();
        let artists: Vec<_> = rows.iter().map(|r| r.artist_name.clone().unwrap()).collect();
        assert_eq!(artists, vec!["First", "Second", "Third"]);
        assert_eq!(rows[0].played_at_local, "2023-05-01T10:00:00+02:00");
        assert_eq!(rows[0].content_type.as_deref(), Some("music"));
    }

    #[test]
    fn test_open_file_creates_parent_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("nested/dir/history.sqlite");

        let store = SqliteStore::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(store.path(), Some(db_path.as_path()));

        drop(store);
        let reopened = SqliteStore::open(&db_path).unwrap();
        assert_eq!(reopened.count_imports().unwrap(), 0);
    }
}
