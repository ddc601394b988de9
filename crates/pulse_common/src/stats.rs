//! Connection counters for diagnostics output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStats {
    /// Text frames handled on a current-epoch transport
    pub frames_received: u64,
    /// Frames dropped because they failed to decode
    pub frames_rejected: u64,
    pub updates_applied: u64,
    /// Updates dropped by the throttle
    pub updates_throttled: u64,
    /// Successful opens
    pub connects: u64,
    /// Retry timers scheduled
    pub reconnect_attempts: u64,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_update_at: Option<DateTime<Utc>>,
}

impl ConnectionStats {
    /// Share of received updates that made it through the throttle
    pub fn applied_ratio(&self) -> Option<f64> {
        let seen = self.updates_applied + self.updates_throttled;
        if seen == 0 {
            None
        } else {
            Some(self.updates_applied as f64 / seen as f64)
        }
    }
}
