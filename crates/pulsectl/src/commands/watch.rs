//! Watch command - redraw a summary line on every relevant change

use anyhow::{bail, Result};
use pulse_common::{ConnectionStatus, StreamConfig};
use tracing::info;

use crate::display::{self, watch_fields};

pub async fn run(mut config: StreamConfig, interval_ms: Option<u64>) -> Result<()> {
    if let Some(ms) = interval_ms {
        config.throttle_interval_ms = ms;
    }
    let store = super::connect(config)?;
    let mut fields = store.select(watch_fields);
    println!("{}", display::watch_line(fields.get()));

    let outcome = loop {
        tokio::select! {
            changed = fields.changed() => {
                let current = changed?;
                println!("{}", display::watch_line(&current));
                if current.status == ConnectionStatus::Error {
                    break Err(store.last_error().unwrap_or_else(|| "connection failed".to_string()));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing stream");
                break Ok(());
            }
        }
    };

    store.shutdown().await?;
    if let Err(message) = outcome {
        bail!(message);
    }
    Ok(())
}
