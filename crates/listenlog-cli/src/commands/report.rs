//! `listenlog report` command implementation

use crate::aggregate::{Aggregator, ListeningReport};
use crate::config::Config;
use crate::error::Result;
use crate::report::write_report;
use crate::store::SqliteStore;
use colored::Colorize;

/// Aggregate stored events and write `report.md`
pub fn run(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db_path)?;
    let rows = Aggregator::new(config.timezone).load(&store)?;
    let report = ListeningReport::from_rows(&rows, config.top_artists);

    let path = write_report(&report, &config.report_dir)?;

    println!("{} Report written: {}", "✓".green(), path.display());
    if report.is_empty() {
        println!("  No events yet. Run 'listenlog import <EXPORT_ROOT>' first.");
    }

    Ok(())
}
