//! Shared client library for Pulse telemetry consumers.
//!
//! Connects to a telemetry producer over WebSocket, keeps the latest snapshot
//! and a bounded history, and publishes changes through selectors.
//!
//! - `wire`: server frame schema and decoder
//! - `history`: fixed-capacity ring buffer of compact samples
//! - `throttle`: update rate limit
//! - `engine`: I/O-free connection state machine
//! - `connection`: tokio driver and WebSocket transport
//! - `store`: the public handle consumers hold
//! - `selectors`: named projections over the published view

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod history;
pub mod selectors;
pub mod stats;
pub mod store;
pub mod throttle;
pub mod wire;

pub use config::{PulseConfig, StreamConfig};
pub use connection::{Connector, Outbound, TransportEvents, TransportHandle, WebSocketConnector};
pub use engine::{ConnectionStatus, Epoch, TransportEvent};
pub use error::{ConfigError, DecodeError, PulseError, Result};
pub use history::{History, HistoryPoint, RingBuffer};
pub use stats::ConnectionStats;
pub use store::{Selection, StoreView, TelemetryStore};
pub use wire::{LiveSnapshot, ServerFrame, StaticInfo};
