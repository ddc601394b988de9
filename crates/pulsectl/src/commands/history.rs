//! History command - collect for a window, then dump the ring buffer

use anyhow::Result;
use owo_colors::OwoColorize;
use pulse_common::StreamConfig;
use std::time::Duration;
use tracing::info;

use crate::display::{self, history_header, history_row};

pub async fn run(config: StreamConfig, duration_secs: u64, json: bool) -> Result<()> {
    let capacity = config.history_capacity;
    let store = super::connect(config)?;

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(duration_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted, printing what was collected"),
    }

    let points = store.history();
    let status = store.status();
    store.shutdown().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    println!(
        "{}  {} of {} points",
        display::status_label(status),
        points.len(),
        capacity
    );
    println!("{}", history_header().bold());
    for point in &points {
        println!("{}", history_row(point));
    }
    Ok(())
}
