//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap. Execution lives in `commands`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pulse telemetry stream client
#[derive(Parser, Debug)]
#[command(name = "pulsectl")]
#[command(about = "Pulse - live system telemetry from the command line", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Producer WebSocket URL (overrides config and $PULSE_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Config file (overrides $PULSE_CONFIG and the default locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Stream a one-line summary whenever it changes (Ctrl-C to stop)
    Watch {
        /// Minimum spacing between applied updates
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Connect, wait for the first snapshot and print it
    Status {
        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,

        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Collect history for a while, then print it
    History {
        /// How long to collect
        #[arg(long, default_value_t = 30)]
        duration_secs: u64,

        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}
