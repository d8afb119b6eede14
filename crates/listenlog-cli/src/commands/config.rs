//! `listenlog config` command implementation
//!
//! Shows the effective configuration.

use crate::config::Config;
use crate::error::Result;
use colored::Colorize;

/// Environment variables read by [`Config::from_env`], with descriptions
const ENV_VARS: &[(&str, &str)] = &[
    ("LISTENLOG_DB", "Database path"),
    ("LISTENLOG_TIMEZONE", "Civil timezone for local timestamps"),
    ("LISTENLOG_REPORT_DIR", "Report output directory"),
    ("LISTENLOG_TOP_ARTISTS", "Number of artists in the report"),
];

/// Show all configuration
pub fn show(config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("{}", "listenlog configuration:".cyan().bold());
    println!();
    for (key, value) in entries(config) {
        println!("{:<14} {}", format!("{}:", key), value);
    }
    println!();
    println!("{}", "Environment Variables:".cyan());
    for (var, description) in ENV_VARS {
        println!("  {:<22} - {}", var, description);
    }

    Ok(())
}

fn entries(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("db_path", config.db_path.display().to_string()),
        ("timezone", config.timezone.name().to_string()),
        ("report_dir", config.report_dir.display().to_string()),
        ("top_artists", config.top_artists.to_string()),
        ("verbose", config.verbose.to_string()),
    ]
}
