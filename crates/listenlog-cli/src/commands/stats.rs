//! `listenlog stats` command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::SqliteStore;
use colored::Colorize;

/// Print event and import counts
pub fn run(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db_path)?;
    let (events, imports) = counts(&store)?;

    println!("{}", "Listening history:".cyan().bold());
    println!("{:<10} {}", "events:", events);
    println!("{:<10} {}", "imports:", imports);

    Ok(())
}

fn counts(store: &SqliteStore) -> Result<(i64, i64)> {
    Ok((store.count_events()?, store.count_imports()?))
}
