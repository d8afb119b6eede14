//! listenlog CLI - Main entry point

use clap::Parser;
use listenlog_cli::{execute_command, Cli};
use listenlog_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Verbose mode logs debug to the console, otherwise warnings only
    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Warn };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("listenlog")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging, so init failures are ignored
    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli) {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
