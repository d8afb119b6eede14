//! Configuration management for the listenlog CLI
//!
//! Settings come from built-in defaults, then a `.env` file and environment
//! variables, then command-line flags.

use crate::error::{CliError, Result};
use chrono_tz::Tz;
use serde::Serialize;
use std::path::PathBuf;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default database file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "listening.sqlite";

/// Default civil timezone for local timestamps.
pub const DEFAULT_TIMEZONE: &str = "Europe/Paris";

/// Default output directory for `listenlog report`.
pub const DEFAULT_REPORT_DIR: &str = "report";

/// Default number of artists in the top-artists series.
pub const DEFAULT_TOP_ARTISTS: usize = 15;

/// CLI configuration
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// SQLite database path
    pub db_path: PathBuf,

    /// Civil timezone used for "local" timestamps
    #[serde(serialize_with = "serialize_tz")]
    pub timezone: Tz,

    /// Directory the markdown report is written to
    pub report_dir: PathBuf,

    /// Size of the top-artists series
    pub top_artists: usize,

    /// Enable verbose output
    pub verbose: bool,
}

impl Config {
    /// Load config from `.env` and environment variables
    ///
    /// - `LISTENLOG_DB`: database path
    /// - `LISTENLOG_TIMEZONE`: IANA zone name
    /// - `LISTENLOG_REPORT_DIR`: report output directory
    /// - `LISTENLOG_TOP_ARTISTS`: number of artists in the report
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(db) = std::env::var("LISTENLOG_DB") {
            config.db_path = PathBuf::from(db);
        }

        if let Ok(zone) = std::env::var("LISTENLOG_TIMEZONE") {
            config.timezone = parse_timezone(&zone)?;
        }

        if let Ok(dir) = std::env::var("LISTENLOG_REPORT_DIR") {
            config.report_dir = PathBuf::from(dir);
        }

        if let Ok(top) = std::env::var("LISTENLOG_TOP_ARTISTS") {
            config.top_artists = parse_top_artists(&top)?;
        }

        Ok(config)
    }

    /// Set the database path
    pub fn set_db_path(&mut self, path: PathBuf) {
        self.db_path = path;
    }

    /// Set the civil timezone from an IANA name
    pub fn set_timezone(&mut self, zone: &str) -> Result<()> {
        self.timezone = parse_timezone(zone)?;
        Ok(())
    }

    /// Set the report directory
    pub fn set_report_dir(&mut self, dir: PathBuf) {
        self.report_dir = dir;
    }

    /// Set the top-artists count
    pub fn set_top_artists(&mut self, top: usize) -> Result<()> {
        if top == 0 {
            return Err(CliError::config("top artists count must be greater than 0"));
        }
        self.top_artists = top;
        Ok(())
    }

    /// Enable verbose output
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            timezone: chrono_tz::Europe::Paris,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            top_artists: DEFAULT_TOP_ARTISTS,
            verbose: false,
        }
    }
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CliError::config(format!("unknown timezone '{}'", name)))
}

fn parse_top_artists(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CliError::config(format!(
            "LISTENLOG_TOP_ARTISTS must be a positive integer, got '{}'",
            raw
        ))),
    }
}

fn serialize_tz<S: serde::Serializer>(tz: &Tz, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(tz.name())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("LISTENLOG_DB");
        std::env::remove_var("LISTENLOG_TIMEZONE");
        std::env::remove_var("LISTENLOG_REPORT_DIR");
        std::env::remove_var("LISTENLOG_TOP_ARTISTS");
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.timezone.name(), DEFAULT_TIMEZONE);
        assert_eq!(config.top_artists, 15);
        assert!(!config.verbose);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clear_env();
        std::env::set_var("LISTENLOG_DB", "/tmp/history.sqlite");
        std::env::set_var("LISTENLOG_TIMEZONE", "America/New_York");
        std::env::set_var("LISTENLOG_TOP_ARTISTS", "5");

        let config = Config::from_env().unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/history.sqlite"));
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.top_artists, 5);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_rejects_unknown_timezone() {
        clear_env();
        std::env::set_var("LISTENLOG_TIMEZONE", "Mars/Olympus_Mons");

        let result = Config::from_env();
        assert!(matches!(result, Err(CliError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_config_setters() {
        let mut config = Config::default();

        config.set_timezone("UTC").unwrap();
        assert_eq!(config.timezone, chrono_tz::UTC);

        assert!(config.set_top_artists(0).is_err());
        config.set_top_artists(3).unwrap();
        assert_eq!(config.top_artists, 3);

        config.set_db_path(PathBuf::from("other.sqlite"));
        assert_eq!(config.db_path, PathBuf::from("other.sqlite"));
    }

    #[test]
    fn test_config_serializes_zone_name() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["timezone"], "Europe/Paris");
    }
}
