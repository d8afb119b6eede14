//! Export file discovery
//!
//! Walks an export root and returns every file whose name matches one of the
//! known export naming styles. Paths are deduplicated by their canonical
//! form so a symlink and its target are only returned once.

use crate::error::{CliError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File name patterns for both export generations (case-sensitive)
pub const EXPORT_FILE_PATTERNS: &[&str] = &[
    "StreamingHistory*.json",
    "*StreamingHistory*.json",
    "endsong*.json",
    "*endsong*.json",
];

/// Candidate export files under a root directory
pub struct FileDiscovery {
    matcher: GlobSet,
}

impl FileDiscovery {
    /// Build a discovery using [`EXPORT_FILE_PATTERNS`]
    pub fn new() -> Result<Self> {
        Self::with_patterns(EXPORT_FILE_PATTERNS)
    }

    /// Build a discovery for custom file name patterns
    pub fn with_patterns(patterns: &[&str]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self {
            matcher: builder.build()?,
        })
    }

    /// Whether a bare file name matches any pattern
    pub fn matches_name(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }

    /// Recursively list candidate files under `root`
    ///
    /// Order follows a name-sorted walk, so repeated runs log identically.
    /// Entries that cannot be read are skipped with a warning.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(CliError::InvalidExportRoot(root.display().to_string()));
        }

        let mut seen = HashSet::new();
        let mut files = Vec::new();

        let walker = WalkDir::new(root).follow_links(true).sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry during discovery");
                    continue;
                },
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !self.matches_name(name) {
                continue;
            }

            let resolved = match entry.path().canonicalize() {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(error = %e, path = %entry.path().display(), "Cannot resolve candidate file");
                    continue;
                },
            };

            if seen.insert(resolved) {
                files.push(entry.into_path());
            } else {
                debug!(path = %entry.path().display(), "Skipping alias of an already discovered file");
            }
        }

        debug!(root = %root.display(), count = files.len(), "Discovery complete");
        Ok(files)
    }
}
