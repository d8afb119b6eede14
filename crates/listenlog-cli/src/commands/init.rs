//! `listenlog init` command implementation
//!
//! Creates the database file and schema.

use crate::config::Config;
use crate::error::Result;
use crate::store::SqliteStore;
use colored::Colorize;
use tracing::info;

/// Create (or upgrade) the database at the configured path
pub fn run(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db_path)?;
    info!(path = %config.db_path.display(), "Database initialized");

    println!("{} Database initialized: {}", "✓".green(), config.db_path.display());
    let imports = store.count_imports()?;
    if imports > 0 {
        println!("  {} files already imported", imports);
    }

    Ok(())
}
