//! Config command

use anyhow::{Context, Result};
use pulse_common::PulseConfig;
use std::path::Path;

/// Load the config file chain with the `--url` flag applied before validation
pub fn load_effective(path: Option<&Path>, url: Option<String>) -> Result<PulseConfig> {
    PulseConfig::load(path, url).context("Failed to load configuration")
}

pub fn render(config: &PulseConfig) -> Result<String> {
    config
        .to_toml()
        .context("Failed to render configuration")
}

pub fn run(config: &PulseConfig) -> Result<()> {
    print!("{}", render(config)?);
    Ok(())
}
