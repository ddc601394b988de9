//! Connection state machine
//!
//! The engine owns every piece of client state (status, epoch, retry budget,
//! static info, latest snapshot, history, throttle) and performs no I/O.
//! Each handler reads the current fields, mutates them, and returns the
//! [`Effect`]s the driver must carry out (open a socket, arm a timer, ...).
//!
//! States:
//!
//! ```text
//!   Disconnected --connect--> Connecting --open--> Connected
//!        ^                       ^   |                 |
//!        |                       |   +----close--------+
//!        |                       +--retry timer--+     |
//!        +--disconnect / shutdown frame--(any)   |     v
//!                                           budget exhausted --> Error
//! ```
//!
//! Every transport event and timer tick carries the epoch it was created
//! under. Anything tagged with an epoch other than the current one is dropped
//! without touching state.

use crate::config::StreamConfig;
use crate::history::{History, HistoryPoint};
use crate::stats::ConnectionStats;
use crate::store::StoreView;
use crate::throttle::Throttle;
use crate::wire::{decode_frame, Inbound, LiveSnapshot, ServerFrame, StaticInfo, HEARTBEAT_PROBE};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Identifies the authoritative connection attempt
pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Retry budget exhausted; only an explicit connect resumes
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the transport reported
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    /// Could not establish the connection (bad URL, refused, handshake)
    OpenFailed(String),
    Message(String),
    Error(String),
    Closed { reason: Option<String> },
}

/// Work the driver performs on the engine's behalf
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Open { epoch: Epoch, url: String },
    /// Detach handlers, then close; the transport must not report the close
    Close { epoch: Epoch },
    Send { epoch: Epoch, text: String },
    ScheduleRetry { epoch: Epoch, delay: Duration },
    StartHeartbeat { epoch: Epoch, interval: Duration },
    /// Cancel both the retry timer and the heartbeat
    CancelTimers,
}

pub struct Engine {
    url: String,
    backoff: Duration,
    heartbeat_interval: Duration,
    max_retries: u32,

    epoch: Epoch,
    status: ConnectionStatus,
    /// A transport exists for the current epoch (pending or open)
    transport_live: bool,
    retry_pending: bool,
    retries: u32,

    static_info: Option<Arc<StaticInfo>>,
    live: Option<Arc<LiveSnapshot>>,
    history: History,
    throttle: Throttle,
    last_error: Option<String>,
    stats: ConnectionStats,
}

impl Engine {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            url: config.url.clone(),
            backoff: config.backoff(),
            heartbeat_interval: config.heartbeat_interval(),
            max_retries: config.max_retries,
            epoch: 0,
            status: ConnectionStatus::Disconnected,
            transport_live: false,
            retry_pending: false,
            retries: 0,
            static_info: None,
            live: None,
            history: History::new(config.history_capacity),
            throttle: Throttle::new(config.throttle_interval()),
            last_error: None,
            stats: ConnectionStats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Verbs
    // ------------------------------------------------------------------

    /// Start a fresh connection, replacing any live one
    pub fn connect(&mut self) -> Vec<Effect> {
        let mut effects = self.teardown();
        self.retries = 0;
        self.last_error = None;
        effects.extend(self.begin_attempt());
        effects
    }

    /// Stop everything, including future retries
    pub fn disconnect(&mut self) -> Vec<Effect> {
        let effects = self.teardown();
        self.epoch = self.epoch.wrapping_add(1);
        self.retries = 0;
        self.status = ConnectionStatus::Disconnected;
        info!(epoch = self.epoch, "Disconnected by request");
        effects
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn handle_transport(
        &mut self,
        epoch: Epoch,
        event: TransportEvent,
        now: Instant,
    ) -> Vec<Effect> {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "Dropping stale transport event");
            return Vec::new();
        }

        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(text) => self.on_message(&text, now),
            TransportEvent::Error(error) => {
                // A close follows; that is where the retry decision happens
                warn!(epoch, error = %error, "Transport error");
                Vec::new()
            }
            TransportEvent::OpenFailed(reason) => {
                warn!(epoch, reason = %reason, "Could not open transport");
                self.on_close(Some(reason))
            }
            TransportEvent::Closed { reason } => self.on_close(reason),
        }
    }

    pub fn handle_retry_due(&mut self, epoch: Epoch) -> Vec<Effect> {
        if epoch != self.epoch || !self.retry_pending || self.status != ConnectionStatus::Connecting
        {
            debug!(epoch, current = self.epoch, "Ignoring stale retry timer");
            return Vec::new();
        }
        info!(attempt = self.retries, max = self.max_retries, "Reconnecting");
        self.begin_attempt()
    }

    pub fn handle_heartbeat_due(&mut self, epoch: Epoch) -> Vec<Effect> {
        if epoch != self.epoch || self.status != ConnectionStatus::Connected {
            return Vec::new();
        }
        debug!(epoch, "Sending heartbeat");
        vec![Effect::Send {
            epoch,
            text: HEARTBEAT_PROBE.to_string(),
        }]
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn retry_count(&self) -> u32 {
        self.retries
    }

    pub fn static_info(&self) -> Option<Arc<StaticInfo>> {
        self.static_info.clone()
    }

    pub fn live_data(&self) -> Option<Arc<LiveSnapshot>> {
        self.live.clone()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub fn view(&self) -> StoreView {
        StoreView {
            status: self.status,
            epoch: self.epoch,
            static_info: self.static_info.clone(),
            live: self.live.clone(),
            history_version: self.history.version(),
            last_error: self.last_error.clone(),
            retry_count: self.retries,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::CancelTimers];
        if self.transport_live {
            effects.push(Effect::Close { epoch: self.epoch });
        }
        self.transport_live = false;
        self.retry_pending = false;
        effects
    }

    fn begin_attempt(&mut self) -> Vec<Effect> {
        self.epoch = self.epoch.wrapping_add(1);
        self.status = ConnectionStatus::Connecting;
        self.transport_live = true;
        self.retry_pending = false;
        info!(epoch = self.epoch, url = %self.url, "Connecting");
        vec![Effect::Open {
            epoch: self.epoch,
            url: self.url.clone(),
        }]
    }

    fn on_open(&mut self) -> Vec<Effect> {
        self.status = ConnectionStatus::Connected;
        self.retries = 0;
        self.last_error = None;
        self.stats.connects += 1;
        self.stats.last_connected_at = Some(Utc::now());
        info!(epoch = self.epoch, "Connected");
        vec![Effect::StartHeartbeat {
            epoch: self.epoch,
            interval: self.heartbeat_interval,
        }]
    }

    fn on_close(&mut self, reason: Option<String>) -> Vec<Effect> {
        self.transport_live = false;
        if self.status == ConnectionStatus::Disconnected {
            return Vec::new();
        }

        let mut effects = vec![Effect::CancelTimers];
        if self.retries >= self.max_retries {
            self.status = ConnectionStatus::Error;
            self.last_error = Some(format!(
                "Connection lost after {} retries; giving up",
                self.retries
            ));
            warn!(
                retries = self.retries,
                reason = reason.as_deref().unwrap_or("none"),
                "Retry budget exhausted"
            );
            return effects;
        }

        self.retries += 1;
        self.status = ConnectionStatus::Connecting;
        self.retry_pending = true;
        self.stats.reconnect_attempts += 1;
        info!(
            attempt = self.retries,
            max = self.max_retries,
            backoff_ms = self.backoff.as_millis() as u64,
            reason = reason.as_deref().unwrap_or("none"),
            "Connection closed, scheduling retry"
        );
        effects.push(Effect::ScheduleRetry {
            epoch: self.epoch,
            delay: self.backoff,
        });
        effects
    }

    fn on_message(&mut self, text: &str, now: Instant) -> Vec<Effect> {
        self.stats.frames_received += 1;

        let frame = match decode_frame(text) {
            Ok(Inbound::Pong) => return Vec::new(),
            Ok(Inbound::Frame(frame)) => frame,
            Err(e) => {
                self.stats.frames_rejected += 1;
                warn!(epoch = self.epoch, error = %e, "Dropping malformed frame");
                return Vec::new();
            }
        };

        match frame {
            ServerFrame::Init(init) => {
                info!(hostname = %init.host.hostname, "Received host info");
                self.static_info = Some(Arc::new(StaticInfo::from(init)));
                Vec::new()
            }
            ServerFrame::Update(snapshot) => {
                if !self.throttle.admit(now) {
                    self.stats.updates_throttled += 1;
                    debug!(update_count = snapshot.update_count, "Update throttled");
                    return Vec::new();
                }
                self.history.push(HistoryPoint::from(snapshot.as_ref()));
                self.live = Some(Arc::from(snapshot));
                self.stats.updates_applied += 1;
                self.stats.last_update_at = Some(Utc::now());
                Vec::new()
            }
            ServerFrame::Error { message } => {
                warn!(message = %message, "Producer reported an error");
                self.last_error = Some(message);
                Vec::new()
            }
            ServerFrame::Shutdown { message } => {
                info!(message = %message, "Producer shutting down");
                let effects = self.teardown();
                self.epoch = self.epoch.wrapping_add(1);
                self.retries = 0;
                self.status = ConnectionStatus::Disconnected;
                effects
            }
        }
    }
}
