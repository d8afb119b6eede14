//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function taking the
//! resolved [`Config`](crate::config::Config).

pub mod config;
pub mod import;
pub mod init;
pub mod report;
pub mod stats;
