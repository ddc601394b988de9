//! Status command - first snapshot and host info
//!
//! Connects, waits for the first applied update (or the terminal error
//! state), prints what arrived and disconnects. Exits non-zero when no
//! snapshot arrived in time.

use anyhow::{bail, Result};
use chrono::Local;
use owo_colors::OwoColorize;
use pulse_common::{
    selectors, ConnectionStats, ConnectionStatus, HistoryPoint, LiveSnapshot, StaticInfo,
    StreamConfig,
};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

use crate::display::{
    self, format_bytes, format_rate, format_uptime, history_header, history_row, percent,
    temperature,
};

#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    pub url: &'a str,
    pub status: ConnectionStatus,
    pub last_error: Option<String>,
    pub static_info: Option<&'a StaticInfo>,
    pub live: Option<&'a LiveSnapshot>,
    pub history_len: usize,
    pub latest_point: Option<HistoryPoint>,
    pub stats: &'a ConnectionStats,
}

pub async fn run(config: StreamConfig, timeout_secs: u64, json: bool) -> Result<()> {
    let url = config.url.clone();
    let store = super::connect(config)?;

    let mut progress =
        store.select(|view| (selectors::status(view), selectors::update_count(view)));
    let waited = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        progress.wait_for(|(status, count)| *status == ConnectionStatus::Error || *count > 0),
    )
    .await;
    if waited.is_err() {
        warn!(timeout_secs, "Timed out waiting for the first snapshot");
    }

    let static_info = store.static_info();
    let live = store.live_data();
    let stats = store.stats();
    let report = StatusReport {
        url: &url,
        status: store.status(),
        last_error: store.last_error(),
        static_info: static_info.as_deref(),
        live: live.as_deref(),
        history_len: store.history_len(),
        latest_point: store.latest_point(),
        stats: &stats,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    store.shutdown().await?;
    if report.live.is_none() {
        bail!("No telemetry received from {}", url);
    }
    Ok(())
}

fn print_kv(key: &str, value: &str) {
    println!("  {:<12} {}", key.dimmed(), value);
}

pub fn print_report(report: &StatusReport<'_>) {
    println!();
    println!("{}  {}", display::status_label(report.status), report.url.bold());
    println!("{}", display::SEPARATOR.dimmed());

    if let Some(error) = &report.last_error {
        println!("[ERROR] {}", error.red());
    }

    if let Some(info) = report.static_info {
        println!("{}", "[HOST]".cyan());
        print_kv("hostname", &info.host.hostname);
        print_kv("cpu", &format!("{} ({} cores)", info.host.cpu_model, info.host.cpu_cores));
        print_kv("kernel", &info.host.kernel);
        if let Some(os) = &info.host.os {
            print_kv("os", os);
        }
        for disk in &info.disks {
            print_kv("disk", &format!("{} {} {}", disk.name, disk.mount_point, format_bytes(disk.total)));
        }
    }

    if let Some(live) = report.live {
        println!("{}", "[LIVE]".cyan());
        print_kv(
            "cpu",
            &format!("{} {}", percent(live.cpu.load), temperature(live.cpu.temperature)),
        );
        print_kv(
            "memory",
            &format!(
                "{} ({} / {})",
                percent(live.memory.percent),
                format_bytes(live.memory.used),
                format_bytes(live.memory.total)
            ),
        );
        if let Some(gpu) = &live.gpu {
            print_kv(
                "gpu",
                &format!("{} {} {}", gpu.name, percent(gpu.utilization), temperature(gpu.temperature)),
            );
        }
        print_kv(
            "network",
            &format!(
                "{} rx {} tx {}",
                live.network.interface,
                format_rate(live.network.rx_rate),
                format_rate(live.network.tx_rate)
            ),
        );
        if live.battery.present {
            let charge = live
                .battery
                .percent
                .map(|p| format!("{:.0}%", p))
                .unwrap_or_else(|| "--".to_string());
            let state = if live.battery.charging { "charging" } else { "discharging" };
            print_kv("battery", &format!("{} {}", charge, state));
        }
        print_kv(
            "system",
            &format!(
                "up {}, {} processes",
                format_uptime(live.system.uptime_secs),
                live.system.process_count
            ),
        );
        if live.anomaly.is_anomalous {
            print_kv("anomaly", &format!("{:.2}", live.anomaly.score).yellow().to_string());
        }
        if !live.top_processes.is_empty() {
            let top: Vec<String> = live
                .top_processes
                .iter()
                .take(5)
                .map(|p| format!("{} {:.1}%", p.name, p.cpu_percent))
                .collect();
            print_kv("top", &top.join(", "));
        }
    } else {
        println!("{}", "No snapshot received".yellow());
    }

    if let Some(point) = &report.latest_point {
        println!("{} {} points", "[HISTORY]".cyan(), report.history_len);
        println!("  {}", history_header().dimmed());
        println!("  {}", history_row(point));
    }

    println!("{}", display::SEPARATOR.dimmed());
    let last_update = report
        .stats
        .last_update_at
        .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "{}",
        format!("{}, last update {}", display::stats_line(report.stats), last_update).dimmed()
    );
    println!();
}
