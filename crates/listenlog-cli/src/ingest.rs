//! Ingestion coordinator
//!
//! Drives discovery, fingerprinting, decoding, normalization and storage for
//! one export root. Each file is committed as one atomic unit through
//! [`EventStore::insert_import_unit`], so a file is either fully imported
//! with its provenance row or not at all.
//!
//! Failures are tiered:
//!
//! - a record that does not normalize is dropped silently
//! - a file that cannot be read or decoded contributes zero rows but is
//!   still recorded, so it is not reprocessed on every run
//! - a file that cannot be hashed is not recorded and is retried next run
//! - a storage failure aborts the run with [`IngestAborted`]

use crate::discovery::FileDiscovery;
use crate::error::CliError;
use crate::models::{CanonicalEvent, ImportRecord};
use crate::normalize::Normalizer;
use crate::store::EventStore;
use chrono::{SubsecRound, Utc};
use chrono_tz::Tz;
use listenlog_common::checksum::compute_file_checksum;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Counts reported at the end of (or on abort of) a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub export_root: String,
    pub files_found: usize,
    pub new_files_imported: usize,
    pub files_skipped: usize,
    /// Files that could not be fingerprinted; retried next run
    pub files_failed: usize,
    /// Files recorded with zero rows because they were not a JSON array
    pub files_unparseable: usize,
    pub rows_inserted: usize,
}

impl IngestSummary {
    /// Files handled so far, whatever their outcome
    pub fn files_processed(&self) -> usize {
        self.new_files_imported + self.files_skipped + self.files_failed
    }
}

/// Storage failure that stopped a run, with the counts gathered until then
#[derive(Debug, Error)]
#[error("Import aborted after {} of {} files: {source}", .summary.files_processed(), .summary.files_found)]
pub struct IngestAborted {
    pub summary: IngestSummary,
    #[source]
    pub source: CliError,
}

impl From<IngestAborted> for CliError {
    fn from(aborted: IngestAborted) -> Self {
        CliError::IngestAborted(Box::new(aborted))
    }
}

/// What happened to a single discovered file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Imported { rows: usize },
    /// Decoded as zero objects and recorded
    Unparseable,
    /// Fingerprint already in the store
    Skipped,
    /// Fingerprint could not be computed
    Failed,
}

/// Progress notification for one processed file
#[derive(Debug)]
pub struct FileProgress<'p> {
    /// 1-based position in discovery order
    pub index: usize,
    pub total: usize,
    pub path: &'p Path,
    pub outcome: FileOutcome,
}

type ProgressFn<'a> = Box<dyn FnMut(&FileProgress<'_>) + 'a>;

/// Imports export files into an [`EventStore`]
pub struct Ingestor<'a, S: EventStore> {
    store: &'a mut S,
    normalizer: Normalizer,
    discovery: FileDiscovery,
    on_file: Option<ProgressFn<'a>>,
}

impl<'a, S: EventStore> Ingestor<'a, S> {
    pub fn new(store: &'a mut S, zone: Tz) -> Result<Self, CliError> {
        Ok(Self {
            store,
            normalizer: Normalizer::new(zone),
            discovery: FileDiscovery::new()?,
            on_file: None,
        })
    }

    /// Register a callback invoked after each file
    pub fn on_file(mut self, callback: impl FnMut(&FileProgress<'_>) + 'a) -> Self {
        self.on_file = Some(Box::new(callback));
        self
    }

    /// Import every candidate file under `root`
    pub fn run(&mut self, root: &Path) -> Result<IngestSummary, IngestAborted> {
        let mut summary = IngestSummary {
            export_root: root.display().to_string(),
            ..Default::default()
        };

        let root = match self.resolve_root(root) {
            Ok(root) => root,
            Err(source) => return Err(IngestAborted { summary, source }),
        };
        summary.export_root = root.display().to_string();

        let files = match self.discovery.discover(&root) {
            Ok(files) => files,
            Err(source) => return Err(IngestAborted { summary, source }),
        };
        summary.files_found = files.len();
        info!(root = %root.display(), files = files.len(), "Starting import");

        for (i, path) in files.iter().enumerate() {
            let outcome = match self.ingest_file(&summary.export_root, path) {
                Ok(outcome) => outcome,
                Err(source) => {
                    error!(path = %path.display(), error = %source, "Storage failure, aborting import");
                    return Err(IngestAborted { summary, source });
                },
            };

            match outcome {
                FileOutcome::Imported { rows } => {
                    summary.new_files_imported += 1;
                    summary.rows_inserted += rows;
                },
                FileOutcome::Unparseable => {
                    summary.new_files_imported += 1;
                    summary.files_unparseable += 1;
                },
                FileOutcome::Skipped => summary.files_skipped += 1,
                FileOutcome::Failed => summary.files_failed += 1,
            }

            if let Some(callback) = self.on_file.as_mut() {
                callback(&FileProgress {
                    index: i + 1,
                    total: files.len(),
                    path,
                    outcome,
                });
            }
        }

        info!(
            found = summary.files_found,
            imported = summary.new_files_imported,
            skipped = summary.files_skipped,
            failed = summary.files_failed,
            rows = summary.rows_inserted,
            "Import complete"
        );
        Ok(summary)
    }

    fn resolve_root(&self, root: &Path) -> Result<PathBuf, CliError> {
        if !root.is_dir() {
            return Err(CliError::InvalidExportRoot(root.display().to_string()));
        }
        Ok(root.canonicalize()?)
    }

    /// Process one file; only storage errors are returned
    fn ingest_file(&mut self, export_root: &str, path: &Path) -> Result<FileOutcome, CliError> {
        let file_hash = match compute_file_checksum(path) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot fingerprint file, will retry next run");
                return Ok(FileOutcome::Failed);
            },
        };

        if self.store.record_exists(&file_hash)? {
            debug!(path = %path.display(), file_hash = %file_hash, "Already imported, skipping");
            return Ok(FileOutcome::Skipped);
        }

        let (rows, parsed) = match decode_file(path) {
            Some(items) => (self.normalize_all(&items), true),
            None => (Vec::new(), false),
        };

        let record = ImportRecord {
            imported_at: Utc::now().trunc_subsecs(0),
            export_root: export_root.to_string(),
            file_path: path.display().to_string(),
            file_hash,
            rows_inserted: rows.len() as i64,
        };

        self.store.insert_import_unit(&rows, &record)?;
        debug!(path = %path.display(), file_hash = %record.file_hash, rows = rows.len(), "Imported file");

        Ok(if parsed {
            FileOutcome::Imported { rows: rows.len() }
        } else {
            FileOutcome::Unparseable
        })
    }

    fn normalize_all(&self, items: &[Value]) -> Vec<CanonicalEvent> {
        items
            .iter()
            .filter_map(|item| self.normalizer.normalize_value(item))
            .collect()
    }
}

/// Read a file as a JSON array; `None` when unreadable, invalid, or not an array
fn decode_file(path: &Path) -> Option<Vec<Value>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read file, recording it with no rows");
            return None;
        },
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Array(items)) => Some(items),
        Ok(_) => {
            warn!(path = %path.display(), "File is not a JSON array, recording it with no rows");
            None
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid JSON, recording it with no rows");
            None
        },
    }
}

/// Run one import with default options
pub fn ingest_export<S: EventStore>(
    store: &mut S,
    root: &Path,
    zone: Tz,
) -> Result<IngestSummary, CliError> {
    Ok(Ingestor::new(store, zone)?.run(root)?)
}
