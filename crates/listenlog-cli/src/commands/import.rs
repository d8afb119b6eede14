//! `listenlog import` command implementation
//!
//! Imports an export directory into the database and prints the summary.
//! On a storage failure the partial summary is still printed before the
//! error is returned.

use crate::config::Config;
use crate::error::Result;
use crate::ingest::{IngestSummary, Ingestor};
use crate::progress::{create_file_progress, record_file};
use crate::store::SqliteStore;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use std::path::Path;

/// Import every export file under `export_root`
pub fn run(config: &Config, export_root: &Path, json: bool) -> Result<()> {
    let mut store = SqliteStore::open(&config.db_path)?;

    let pb = create_file_progress("Importing export files", !json);
    let result = Ingestor::new(&mut store, config.timezone)?
        .on_file(|progress| record_file(&pb, progress))
        .run(export_root);
    pb.finish_and_clear();

    match result {
        Ok(summary) => {
            print_summary(&summary, json, true)?;
            Ok(())
        },
        Err(aborted) => {
            print_summary(&aborted.summary, json, false)?;
            Err(aborted.into())
        },
    }
}

fn print_summary(summary: &IngestSummary, json: bool, complete: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    if complete {
        println!("{} Import complete", "✓".green());
    } else {
        println!("{} Import aborted, partial summary:", "✗".red());
    }
    print!("{}", format_summary_table(summary));
    Ok(())
}

/// Render the summary as a two-column table
pub fn format_summary_table(summary: &IngestSummary) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Field", "Value"]);

    let rows: [(&str, String); 7] = [
        ("export_root", summary.export_root.clone()),
        ("files_found", summary.files_found.to_string()),
        ("new_files_imported", summary.new_files_imported.to_string()),
        ("files_skipped", summary.files_skipped.to_string()),
        ("files_failed", summary.files_failed.to_string()),
        ("files_unparseable", summary.files_unparseable.to_string()),
        ("rows_inserted", summary.rows_inserted.to_string()),
    ];
    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value]);
    }

    format!("{}\n", table)
}
