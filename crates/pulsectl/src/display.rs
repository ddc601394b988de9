//! Terminal formatting - ASCII only, colour via owo-colors

use owo_colors::OwoColorize;
use pulse_common::history::HistoryPoint;
use pulse_common::{selectors, ConnectionStats, ConnectionStatus, StoreView};

pub const SEPARATOR: &str = "------------------------------------------------------------";

/// The fields `pulsectl watch` redraws on
#[derive(Debug, Clone, PartialEq)]
pub struct WatchFields {
    pub status: ConnectionStatus,
    pub retry_count: u32,
    pub cpu_load: f64,
    pub cpu_temp: Option<f64>,
    pub memory_percent: f64,
    pub network_interface: Option<String>,
    pub gpu_utilization: Option<f64>,
}

/// Composite selector over the named ones
pub fn watch_fields(view: &StoreView) -> WatchFields {
    WatchFields {
        status: selectors::status(view),
        retry_count: selectors::retry_count(view),
        cpu_load: selectors::cpu_load(view),
        cpu_temp: selectors::cpu_temp(view),
        memory_percent: selectors::memory_percent(view),
        network_interface: selectors::network_interface(view),
        gpu_utilization: selectors::gpu_utilization(view),
    }
}

pub fn status_label(status: ConnectionStatus) -> String {
    let label = format!("[{}]", status.as_str().to_uppercase());
    match status {
        ConnectionStatus::Connected => label.bright_green().to_string(),
        ConnectionStatus::Connecting => label.yellow().to_string(),
        ConnectionStatus::Disconnected => label.dimmed().to_string(),
        ConnectionStatus::Error => label.bright_red().to_string(),
    }
}

/// Colour a 0-100 value by load band
pub fn percent(value: f64) -> String {
    let text = format!("{:5.1}%", value);
    if value >= 90.0 {
        text.bright_red().to_string()
    } else if value >= 70.0 {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

pub fn temperature(value: Option<f64>) -> String {
    match value {
        Some(celsius) => format!("{:.0}C", celsius),
        None => "--".to_string(),
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0) as u64))
}

pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// One `watch` line
pub fn watch_line(fields: &WatchFields) -> String {
    let mut line = status_label(fields.status);
    if fields.status == ConnectionStatus::Connecting && fields.retry_count > 0 {
        line.push_str(&format!(" retry {}", fields.retry_count));
    }
    if fields.status != ConnectionStatus::Connected {
        return line;
    }

    line.push_str(&format!(
        "  cpu {} {:>4}  mem {}",
        percent(fields.cpu_load),
        temperature(fields.cpu_temp),
        percent(fields.memory_percent),
    ));
    if let Some(gpu) = fields.gpu_utilization {
        line.push_str(&format!("  gpu {}", percent(gpu)));
    }
    if let Some(interface) = &fields.network_interface {
        line.push_str(&format!("  net {}", interface.cyan()));
    }
    line
}

/// Plain-text history row
pub fn history_row(point: &HistoryPoint) -> String {
    format!(
        "{:>14.1}  {:>6.1}  {:>5}  {:>10}  {:>12}  {:>12}  {:>12}  {:>12}",
        point.timestamp,
        point.cpu_load,
        temperature(point.cpu_temp),
        format_bytes(point.memory_used),
        format_rate(point.net_rx),
        format_rate(point.net_tx),
        format_rate(point.disk_read),
        format_rate(point.disk_write),
    )
}

/// Counter summary; the applied share is left out until an update arrives
pub fn stats_line(stats: &ConnectionStats) -> String {
    let applied = stats
        .applied_ratio()
        .map(|ratio| format!(" {:.0}% applied", ratio * 100.0))
        .unwrap_or_default();
    format!(
        "frames {} (rejected {}), updates {} (throttled {}{}), connects {}, retries {}",
        stats.frames_received,
        stats.frames_rejected,
        stats.updates_applied,
        stats.updates_throttled,
        applied,
        stats.connects,
        stats.reconnect_attempts
    )
}

pub fn history_header() -> String {
    format!(
        "{:>14}  {:>6}  {:>5}  {:>10}  {:>12}  {:>12}  {:>12}  {:>12}",
        "timestamp", "cpu%", "temp", "mem", "net rx", "net tx", "disk rd", "disk wr"
    )
}
