//! Progress bar utilities for CLI operations
//!
//! Provides progress indicators for long-running imports.

use crate::ingest::{FileOutcome, FileProgress};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const FILE_BAR_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files";

/// Create a progress bar over discovered export files
///
/// The length is unknown until discovery finishes; it is set from the first
/// progress notification.
pub fn create_file_progress(message: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(FILE_BAR_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_message(message.to_string());
    pb
}

/// Advance `pb` for one processed file
pub fn record_file(pb: &ProgressBar, progress: &FileProgress<'_>) {
    pb.set_length(progress.total as u64);
    pb.set_position(progress.index as u64);

    let name = progress
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    pb.set_message(format!("{} {}", outcome_label(progress.outcome), name));
}

/// Short label shown next to the file name
pub fn outcome_label(outcome: FileOutcome) -> String {
    match outcome {
        FileOutcome::Imported { rows } => format!("imported ({} rows)", rows),
        FileOutcome::Unparseable => "recorded (no rows)".to_string(),
        FileOutcome::Skipped => "skipped".to_string(),
        FileOutcome::Failed => "failed".to_string(),
    }
}
