//! Pulse configuration
//!
//! Stream client settings live in the `[stream]` table of `config.toml`.
//! Every key is optional; missing keys fall back to the defaults below.
//!
//! Discovery order:
//! 1. Explicit path (`--config`)
//! 2. `$PULSE_CONFIG`
//! 3. `$XDG_CONFIG_HOME/pulse/config.toml`
//! 4. `/etc/pulse/config.toml`
//! 5. Built-in defaults
//!
//! `$PULSE_URL` overrides the stream URL after loading.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// System-wide config file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/pulse/config.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "PULSE_CONFIG";

/// Environment variable overriding the stream URL
pub const URL_ENV: &str = "PULSE_URL";

/// Telemetry stream client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// WebSocket endpoint of the telemetry producer
    #[serde(default = "default_url")]
    pub url: String,

    /// Number of points kept in the history window
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Minimum spacing between applied updates (milliseconds)
    #[serde(default = "default_throttle_interval")]
    pub throttle_interval_ms: u64,

    /// Flat delay before each reconnection attempt (milliseconds)
    #[serde(default = "default_backoff")]
    pub backoff_ms: u64,

    /// Consecutive failures tolerated before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Interval between `ping` probes while connected (milliseconds)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
}

fn default_url() -> String {
    "ws://127.0.0.1:8765/ws".to_string()
}

fn default_history_capacity() -> usize {
    180 // 3 minutes at the producer's 1 Hz tick
}

fn default_throttle_interval() -> u64 {
    1000 // matches the producer tick
}

fn default_backoff() -> u64 {
    3000
}

fn default_max_retries() -> u32 {
    10
}

fn default_heartbeat_interval() -> u64 {
    30_000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            history_capacity: default_history_capacity(),
            throttle_interval_ms: default_throttle_interval(),
            backoff_ms: default_backoff(),
            max_retries: default_max_retries(),
            heartbeat_interval_ms: default_heartbeat_interval(),
        }
    }
}

impl StreamConfig {
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "url must use ws:// or wss://, got {}",
                self.url
            )));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_interval_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub stream: StreamConfig,
}

impl PulseConfig {
    /// Load config following the discovery chain, apply the `$PULSE_URL` and
    /// `url` overrides, then validate the result once.
    ///
    /// A missing file is not an error; an unreadable or invalid one is.
    pub fn load(explicit: Option<&Path>, url: Option<String>) -> Result<Self, ConfigError> {
        let mut config = match Self::discover_path(explicit) {
            Some(path) => Self::load_from_path(&path)?,
            None => {
                warn!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_url_overrides(std::env::var(URL_ENV).ok(), url);
        config.stream.validate()?;
        Ok(config)
    }

    /// The explicit override beats the environment, which beats the file
    fn apply_url_overrides(&mut self, env_url: Option<String>, explicit: Option<String>) {
        if let Some(url) = env_url {
            info!(url = %url, "Stream URL overridden from {}", URL_ENV);
            self.stream.url = url;
        }
        if let Some(url) = explicit {
            info!(url = %url, "Stream URL overridden from the command line");
            self.stream.url = url;
        }
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PulseConfig = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn discover_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        if let Some(dir) = dirs::config_dir() {
            let user = dir.join("pulse").join("config.toml");
            if user.exists() {
                return Some(user);
            }
        }

        let system = PathBuf::from(SYSTEM_CONFIG_PATH);
        if system.exists() {
            return Some(system);
        }

        None
    }

    /// Render as TOML (for `pulsectl config`)
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.history_capacity, 180);
        assert_eq!(config.throttle_interval(), Duration::from_millis(1000));
        assert_eq!(config.backoff(), Duration::from_secs(3));
        assert_eq!(config.max_retries, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
[stream]
url = "ws://10.0.0.5:9000/telemetry"
max_retries = 3
"#;
        let config: PulseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stream.url, "ws://10.0.0.5:9000/telemetry");
        assert_eq!(config.stream.max_retries, 3);
        // Defaults for missing fields
        assert_eq!(config.stream.backoff_ms, 3000);
        assert_eq!(config.stream.history_capacity, 180);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: PulseConfig = toml::from_str("").unwrap();
        assert_eq!(config, PulseConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url = StreamConfig::default().with_url("http://localhost");
        assert!(matches!(bad_url.validate(), Err(ConfigError::Invalid(_))));

        let zero_capacity = StreamConfig {
            history_capacity: 0,
            ..StreamConfig::default()
        };
        assert!(zero_capacity.validate().is_err());

        let zero_retries = StreamConfig {
            max_retries: 0,
            ..StreamConfig::default()
        };
        assert!(zero_retries.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[stream]\nhistory_capacity = 60\nbackoff_ms = 500").unwrap();

        let config = PulseConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.stream.history_capacity, 60);
        assert_eq!(config.stream.backoff(), Duration::from_millis(500));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = PulseConfig::load_from_path(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_explicit_url_replaces_invalid_env_url() {
        let mut config = PulseConfig::default();
        config.apply_url_overrides(
            Some("http://stale.lan".to_string()),
            Some("ws://atlas.lan:8765/ws".to_string()),
        );
        assert_eq!(config.stream.url, "ws://atlas.lan:8765/ws");
        assert!(config.stream.validate().is_ok());

        // Without the explicit override the env value is what gets checked
        let mut config = PulseConfig::default();
        config.apply_url_overrides(Some("http://stale.lan".to_string()), None);
        assert!(config.stream.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_keeps_keys() {
        let rendered = PulseConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[stream]"));
        assert!(rendered.contains("heartbeat_interval_ms = 30000"));
    }
}
