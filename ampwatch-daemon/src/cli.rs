//! CLI argument definitions for ampwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Ampwatch quarantine notification daemon.
///
/// Tails the mail appliance log, correlates per-message events and
/// notifies senders whose messages were quarantined for AMP analysis.
#[derive(Parser, Debug)]
#[command(name = "ampwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to ampwatch.toml configuration file.
    #[arg(short, long, default_value = "/etc/ampwatch/ampwatch.toml")]
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

    /// Override the watched log file path (takes precedence over config file).
    #[arg(long)]
    pub log_path: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
