//! CLI argument definitions for poolwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Poolwatch blue/green monitoring daemon.
///
/// Tails the reverse proxy access log, detects pool failovers and
/// error-rate spikes, and delivers deduplicated alerts to a webhook
/// endpoint.
#[derive(Parser, Debug)]
#[command(name = "poolwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to poolwatch.toml configuration file.
    ///
    /// When the default path does not exist the daemon runs on
    /// built-in defaults plus environment variable overrides.
    #[arg(short, long, default_value = "/etc/poolwatch/poolwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the access log path to tail.
    #[arg(long)]
    pub access_log: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
