//! Update throttle
//!
//! Admits at most one update per interval. Frames arriving inside the window
//! are dropped outright; nothing is merged into the next admitted frame.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_applied: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_applied: None,
        }
    }

    /// Returns true (and records `now`) if an update may be applied
    pub fn admit(&mut self, now: Instant) -> bool {
        let open = match self.last_applied {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if open {
            self.last_applied = Some(now);
        }
        open
    }
}
