//! Pulse Control - CLI client for a Pulse telemetry producer
//!
//! Streams live system telemetry over WebSocket and prints it.

use anyhow::Result;
use clap::Parser;
use pulsectl::cli::{Cli, Commands};
use pulsectl::{commands, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = commands::config::load_effective(cli.config.as_deref(), cli.url)?;

    match cli.command {
        Commands::Watch { interval_ms } => commands::watch::run(config.stream, interval_ms).await,
        Commands::Status { timeout_secs, json } => {
            commands::status::run(config.stream, timeout_secs, json).await
        }
        Commands::History {
            duration_secs,
            json,
        } => commands::history::run(config.stream, duration_secs, json).await,
        Commands::Config => commands::config::run(&config),
    }
}
