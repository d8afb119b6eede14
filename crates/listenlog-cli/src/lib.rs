//! listenlog CLI Library
//!
//! Imports streaming-history exports into a local SQLite database and
//! reports on them.
//!
//! # Overview
//!
//! - **Database setup**: create the store (`listenlog init`)
//! - **Import**: discover, fingerprint, normalize and store export files
//!   (`listenlog import <EXPORT_ROOT>`)
//! - **Counts**: events and imported files (`listenlog stats`)
//! - **Reporting**: aggregate and write a markdown report (`listenlog report`)
//! - **Configuration**: show effective settings (`listenlog config`)
//!
//! Importing is idempotent: files are identified by a SHA-256 of their
//! content, and each file is committed atomically with its provenance row.

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod report;
pub mod store;
pub mod timestamp;

// Re-export commonly used types
pub use config::Config;
pub use error::{CliError, Result};
pub use ingest::{ingest_export, IngestAborted, IngestSummary, Ingestor};
pub use store::{EventStore, SqliteStore};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// listenlog - streaming history importer
#[derive(Parser, Debug)]
#[command(name = "listenlog")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// SQLite database path
    #[arg(long, env = "LISTENLOG_DB", global = true)]
    pub db: Option<PathBuf>,

    /// IANA timezone used for local timestamps (e.g. Europe/Paris)
    #[arg(long, env = "LISTENLOG_TIMEZONE", global = true)]
    pub timezone: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and schema
    Init,

    /// Import every export file found under a directory
    Import {
        /// Directory containing the extracted export
        export_root: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show event and import counts
    Stats,

    /// Aggregate events and write a markdown report
    Report {
        /// Output directory for report.md
        #[arg(short, long, env = "LISTENLOG_REPORT_DIR")]
        out_dir: Option<PathBuf>,

        /// Number of artists in the top-artists table
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Show effective configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Resolve configuration: environment first, then flags
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;
        config.set_verbose(self.verbose);

        if let Some(db) = &self.db {
            config.set_db_path(db.clone());
        }
        if let Some(zone) = &self.timezone {
            config.set_timezone(zone)?;
        }
        if let Commands::Report { out_dir, top } = &self.command {
            if let Some(dir) = out_dir {
                config.set_report_dir(dir.clone());
            }
            if let Some(top) = top {
                config.set_top_artists(*top)?;
            }
        }

        Ok(config)
    }
}

/// Execute the CLI command
pub fn execute_command(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config()?;

    match &cli.command {
        Commands::Init => commands::init::run(&config),
        Commands::Import { export_root, json } => commands::import::run(&config, export_root, *json),
        Commands::Stats => commands::stats::run(&config),
        Commands::Report { .. } => commands::report::run(&config),
        Commands::Config { json } => commands::config::show(&config, *json),
    }
}
