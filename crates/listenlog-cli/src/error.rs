//! Error types for the listenlog CLI
//!
//! Messages are user-facing and say what to check next.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Export root is missing or not a directory
    #[error("Invalid export root '{0}'. Point 'listenlog import' at the directory that contains your extracted export.")]
    InvalidExportRoot(String),

    /// SQLite operation failed
    #[error("Database error: {0}. Check that the database file is writable and not corrupted.")]
    Store(#[from] rusqlite::Error),

    /// A provenance row with this fingerprint already exists
    #[error("File with fingerprint '{0}' was already imported. Another import may be running against the same database.")]
    DuplicateImport(String),

    /// Stored data could not be decoded
    #[error("Corrupt row in database: {0}")]
    CorruptRow(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// File name pattern failed to compile
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or command-line flags.")]
    Config(String),

    /// JSON encoding failed
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Ingestion stopped before finishing the export
    #[error(transparent)]
    IngestAborted(#[from] Box<crate::ingest::IngestAborted>),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a corrupt row error
    pub fn corrupt_row(msg: impl Into<String>) -> Self {
        Self::CorruptRow(msg.into())
    }
}
