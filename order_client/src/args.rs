//! Command-line arguments for the order client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use order_common::{ClientConfig, ClientError};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a JSON client configuration file.
    /// Flags below override values from the file.
    #[clap(long)]
    pub config: Option<String>,

    /// Deadline for establishing connections, in milliseconds.
    #[clap(long)]
    pub connect_timeout_ms: Option<u64>,

    /// Deadline for each order send/receive, in milliseconds.
    #[clap(long)]
    pub io_timeout_ms: Option<u64>,

    /// How many times to re-open a dropped feed connection (0 disables).
    #[clap(long)]
    pub reconnect_attempts: Option<u32>,

    /// Do not start the feed listener.
    #[clap(long)]
    pub no_feed: bool,

    /// Submit a single order ("<side> <price> <quantity>") and exit.
    #[clap(long)]
    pub order: Option<String>,
}

impl Args {
    /// Build the effective configuration: defaults, then the file, then flags.
    pub fn client_config(&self) -> Result<ClientConfig, ClientError> {
        let mut config = match &self.config {
            Some(raw) => ClientConfig::from_json_file(&normalize_path(raw))?,
            None => ClientConfig::default(),
        };
        if self.connect_timeout_ms.is_some() {
            config.connect_timeout_ms = self.connect_timeout_ms;
        }
        if self.io_timeout_ms.is_some() {
            config.io_timeout_ms = self.io_timeout_ms;
        }
        if let Some(attempts) = self.reconnect_attempts {
            config.reconnect.max_attempts = attempts;
        }
        config.validate()?;
        Ok(config)
    }

    /// Log level used when `RUST_LOG` is unset. Interactive mode only shows
    /// warnings so log lines do not land between the prompts.
    pub fn default_log_level(&self) -> LevelFilter {
        if self.order.is_some() {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        }
    }
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}
