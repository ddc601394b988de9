//! Command handlers for pulsectl
//!
//! - watch: live one-line summary
//! - status: first snapshot plus host info
//! - history: buffered samples after a collection window
//! - config: effective configuration

pub mod config;
pub mod history;
pub mod status;
pub mod watch;

use anyhow::Result;
use pulse_common::{StreamConfig, TelemetryStore};

/// Start a store and ask it to connect
pub(crate) fn connect(config: StreamConfig) -> Result<TelemetryStore> {
    let store = TelemetryStore::start(config)?;
    store.connect()?;
    Ok(store)
}
