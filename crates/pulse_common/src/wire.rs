//! Wire protocol for the telemetry stream
//!
//! One JSON object per text frame, tagged by `type`, plus the bare `pong`
//! liveness token. Decoding fails closed: the discriminant is checked first,
//! unknown tags and malformed payloads are rejected with [`DecodeError`], and
//! nothing is ever partially applied.
//!
//! ```text
//! {"type":"init",     "static":{..}, "disks":[..], "history":{..}, "timestamp":n}
//! {"type":"update",   "cpu":{..}, "memory":{..}, ... "update_count":n, "timestamp":n}
//! {"type":"error",    "message":".."}
//! {"type":"shutdown", "message":".."}
//! pong
//! ```

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound liveness probe
pub const HEARTBEAT_PROBE: &str = "ping";

/// Inbound liveness reply (not JSON)
pub const HEARTBEAT_REPLY: &str = "pong";

/// Result of decoding one inbound text frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Liveness reply, carries no data
    Pong,
    Frame(ServerFrame),
}

/// Messages pushed by the telemetry producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Once per connection: host description
    Init(InitPayload),
    /// Every tick: complete system state (never a delta)
    Update(Box<LiveSnapshot>),
    /// Producer-side problem; the stream stays open
    Error { message: String },
    /// Producer is going away on purpose
    Shutdown {
        #[serde(default)]
        message: String,
    },
}

const KNOWN_TYPES: [&str; 4] = ["init", "update", "error", "shutdown"];

/// Decode one text frame
pub fn decode_frame(text: &str) -> Result<Inbound, DecodeError> {
    let trimmed = text.trim();
    if trimmed == HEARTBEAT_REPLY {
        return Ok(Inbound::Pong);
    }

    let value: Value = serde_json::from_str(trimmed)?;
    let kind = {
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingType)?;
        KNOWN_TYPES
            .iter()
            .copied()
            .find(|known| *known == kind)
            .ok_or_else(|| DecodeError::UnknownType(kind.to_string()))?
    };

    serde_json::from_value(value)
        .map(Inbound::Frame)
        .map_err(|source| DecodeError::Payload { kind, source })
}

// ============================================================================
// INIT PAYLOAD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitPayload {
    #[serde(rename = "static")]
    pub host: HostInfo,

    #[serde(default)]
    pub disks: Vec<DiskDescriptor>,

    /// Producer-side backlog; opaque to this client
    #[serde(default)]
    pub history: Option<Value>,

    pub timestamp: f64,
}

/// Host identity reported once per connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub cpu_model: String,
    pub cpu_cores: u32,
    #[serde(default)]
    pub cpu_threads: Option<u32>,
    pub kernel: String,
    #[serde(default)]
    pub os: Option<String>,
    /// Total RAM in bytes
    #[serde(default)]
    pub total_memory: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskDescriptor {
    pub name: String,
    #[serde(default)]
    pub mount_point: String,
    #[serde(default)]
    pub fs_type: Option<String>,
    /// Capacity in bytes
    #[serde(default)]
    pub total: u64,
}

/// What the store keeps from an `init` frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticInfo {
    pub host: HostInfo,
    pub disks: Vec<DiskDescriptor>,
    pub timestamp: f64,
}

impl From<InitPayload> for StaticInfo {
    fn from(init: InitPayload) -> Self {
        Self {
            host: init.host,
            disks: init.disks,
            timestamp: init.timestamp,
        }
    }
}

// ============================================================================
// UPDATE PAYLOAD
// ============================================================================

/// Full system state for one producer tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    #[serde(default)]
    pub gpu: Option<GpuStats>,
    pub network: NetworkStats,
    pub disks: Vec<DiskStats>,
    pub battery: BatteryStats,
    pub system: SystemStats,
    pub anomaly: AnomalyStats,
    pub top_processes: Vec<ProcessStats>,

    // Producer-specific sub-records, carried through untouched
    #[serde(default)]
    pub hardware_health: Option<Value>,
    #[serde(default)]
    pub cognitive: Option<Value>,
    #[serde(default)]
    pub full_sensors: Option<Value>,
    #[serde(default)]
    pub physics_diagnostics: Option<Value>,

    pub update_count: u64,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    /// Overall utilisation, 0-100
    pub load: f64,
    /// Package temperature in °C, when a sensor is exposed
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub frequency_mhz: Option<f64>,
    #[serde(default)]
    pub per_core: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Bytes in use
    pub used: u64,
    /// Bytes installed
    pub total: u64,
    pub percent: f64,
    #[serde(default)]
    pub swap_used: u64,
    #[serde(default)]
    pub swap_total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuStats {
    #[serde(default)]
    pub name: String,
    /// Utilisation, 0-100
    pub utilization: f64,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub memory_used: Option<u64>,
    #[serde(default)]
    pub memory_total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Interface the rates were sampled on
    pub interface: String,
    /// Receive rate, bytes/s
    pub rx_rate: f64,
    /// Transmit rate, bytes/s
    pub tx_rate: f64,
    #[serde(default)]
    pub rx_total: u64,
    #[serde(default)]
    pub tx_total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStats {
    pub name: String,
    /// Bytes/s
    #[serde(default)]
    pub read_rate: f64,
    /// Bytes/s
    #[serde(default)]
    pub write_rate: f64,
    #[serde(default)]
    pub usage_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryStats {
    #[serde(default)]
    pub present: bool,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub charging: bool,
    #[serde(default)]
    pub time_remaining_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub uptime_secs: u64,
    pub process_count: u32,
    #[serde(default)]
    pub load_avg: Vec<f64>,
}

/// Anomaly verdict computed by the producer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyStats {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub is_anomalous: bool,
    #[serde(default)]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_bytes: u64,
}


#[cfg(test)]
mod tests {
    use super::fixtures::{init_frame, update_frame};
    use super::*;

    #[test]
    fn test_pong_is_not_json_decoded() {
        assert_eq!(decode_frame("pong").unwrap(), Inbound::Pong);
        assert_eq!(decode_frame("  pong\n").unwrap(), Inbound::Pong);
    }

    #[test]
    fn test_decode_init() {
        match decode_frame(&init_frame("atlas")).unwrap() {
            Inbound::Frame(ServerFrame::Init(init)) => {
                assert_eq!(init.host.hostname, "atlas");
                assert_eq!(init.host.cpu_cores, 8);
                assert_eq!(init.disks.len(), 1);
                assert!(init.host.os.is_none());
            }
            other => panic!("expected init, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_update_with_nulls() {
        match decode_frame(&update_frame(7, 42.0)).unwrap() {
            Inbound::Frame(ServerFrame::Update(snapshot)) => {
                assert_eq!(snapshot.update_count, 7);
                assert_eq!(snapshot.cpu.load, 42.0);
                assert_eq!(snapshot.network.interface, "enp5s0");
                assert!(snapshot.hardware_health.is_none());
                assert!(!snapshot.battery.present);
                assert_eq!(snapshot.top_processes[0].name, "firefox");
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_update_without_gpu() {
        let mut value: Value = serde_json::from_str(&update_frame(1, 5.0)).unwrap();
        value["gpu"] = Value::Null;
        let frame = decode_frame(&value.to_string()).unwrap();
        let Inbound::Frame(ServerFrame::Update(snapshot)) = frame else {
            panic!("expected update");
        };
        assert!(snapshot.gpu.is_none());
    }

    #[test]
    fn test_decode_error_and_shutdown() {
        let error = decode_frame(r#"{"type":"error","message":"sensor read failed"}"#).unwrap();
        assert_eq!(
            error,
            Inbound::Frame(ServerFrame::Error {
                message: "sensor read failed".to_string()
            })
        );

        let shutdown = decode_frame(r#"{"type":"shutdown","message":"bye"}"#).unwrap();
        assert!(matches!(
            shutdown,
            Inbound::Frame(ServerFrame::Shutdown { ref message }) if message == "bye"
        ));
    }

    #[test]
    fn test_unknown_type_fails_closed() {
        let err = decode_frame(r#"{"type":"delta","cpu":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(ref t) if t == "delta"));
    }

    #[test]
    fn test_malformed_frames_rejected() {
        assert!(matches!(decode_frame("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_frame("[1,2,3]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode_frame(r#"{"message":"x"}"#), Err(DecodeError::MissingType)));
        assert!(matches!(decode_frame(r#"{"type":7}"#), Err(DecodeError::MissingType)));
    }

    #[test]
    fn test_incomplete_update_is_rejected_whole() {
        let mut value: Value = serde_json::from_str(&update_frame(1, 5.0)).unwrap();
        value.as_object_mut().unwrap().remove("memory");
        let err = decode_frame(&value.to_string()).unwrap_err();
        assert!(matches!(err, DecodeError::Payload { kind: "update", .. }));
    }

    #[test]
    fn test_static_info_drops_history_backlog() {
        let Inbound::Frame(ServerFrame::Init(init)) = decode_frame(&init_frame("atlas")).unwrap()
        else {
            panic!("expected init");
        };
        let info = StaticInfo::from(init);
        assert_eq!(info.host.kernel, "6.6.1-arch1-1");
        assert_eq!(info.timestamp, 1_700_000_000.0);
    }
}
