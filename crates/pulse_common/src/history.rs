//! History window for time-series display
//!
//! A fixed-capacity circular buffer of compact [`HistoryPoint`]s:
//! - O(1) push, overwriting the oldest slot once full (strict FIFO)
//! - O(n) chronological copy-out for rendering
//! - a version counter bumped on every push for cheap change detection
//!
//! Storage is allocated once at construction and never grows. The buffer
//! counts points, not time: a slow producer simply stretches the window.

use crate::wire::LiveSnapshot;
use serde::{Deserialize, Serialize};

/// Per-tick projection of a [`LiveSnapshot`] kept for charts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: f64,
    pub cpu_load: f64,
    pub cpu_temp: Option<f64>,
    pub memory_used: u64,
    pub memory_total: u64,
    pub net_rx: f64,
    pub net_tx: f64,
    /// Sum over all disks, bytes/s
    pub disk_read: f64,
    /// Sum over all disks, bytes/s
    pub disk_write: f64,
    pub gpu_util: Option<f64>,
    pub gpu_temp: Option<f64>,
}

impl From<&LiveSnapshot> for HistoryPoint {
    fn from(snapshot: &LiveSnapshot) -> Self {
        let (disk_read, disk_write) = snapshot
            .disks
            .iter()
            .fold((0.0, 0.0), |(read, write), disk| {
                (read + disk.read_rate, write + disk.write_rate)
            });

        Self {
            timestamp: snapshot.timestamp,
            cpu_load: snapshot.cpu.load,
            cpu_temp: snapshot.cpu.temperature,
            memory_used: snapshot.memory.used,
            memory_total: snapshot.memory.total,
            net_rx: snapshot.network.rx_rate,
            net_tx: snapshot.network.tx_rate,
            disk_read,
            disk_write,
            gpu_util: snapshot.gpu.as_ref().map(|gpu| gpu.utilization),
            gpu_temp: snapshot.gpu.as_ref().and_then(|gpu| gpu.temperature),
        }
    }
}

/// Fixed-capacity circular buffer
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    /// Slot the next push writes to
    next: usize,
    version: u64,
}

/// The store's history window
pub type History = RingBuffer<HistoryPoint>;

impl<T: Clone> RingBuffer<T> {
    /// Create an empty buffer. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            next: 0,
            version: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
        } else {
            self.slots[self.next] = item;
        }
        self.next = (self.next + 1) % self.capacity;
        self.version = self.version.wrapping_add(1);
    }

    /// Owned copy, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        if self.slots.len() < self.capacity {
            return self.slots.clone();
        }
        let mut out = Vec::with_capacity(self.capacity);
        out.extend_from_slice(&self.slots[self.next..]);
        out.extend_from_slice(&self.slots[..self.next]);
        out
    }

    pub fn latest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let index = (self.next + self.capacity - 1) % self.capacity;
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pushes ever made (wrapping)
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::fixtures::update_frame;
    use crate::wire::{decode_frame, Inbound, ServerFrame};

    #[test]
    fn test_scenario_capacity_three() {
        let mut buf = RingBuffer::new(3);
        for ts in [1, 2, 3, 4] {
            buf.push(ts);
        }
        assert_eq!(buf.to_vec(), vec![2, 3, 4]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.latest(), Some(&4));
    }

    #[test]
    fn test_partial_fill_is_in_order() {
        let mut buf = RingBuffer::new(5);
        assert!(buf.is_empty());
        assert_eq!(buf.latest(), None);

        buf.push("a");
        buf.push("b");
        assert_eq!(buf.to_vec(), vec!["a", "b"]);
        assert_eq!(buf.latest(), Some(&"b"));
    }

    #[test]
    fn test_overflow_keeps_last_n_in_order() {
        // Every wraparound offset must come out oldest-first
        for capacity in 1..=7usize {
            for total in 0..=25usize {
                let mut buf = RingBuffer::new(capacity);
                for i in 0..total {
                    buf.push(i);
                }
                let out = buf.to_vec();
                assert_eq!(out.len(), total.min(capacity));
                if total > capacity {
                    assert_eq!(out[0], total - capacity, "cap={} total={}", capacity, total);
                }
                assert!(out.windows(2).all(|w| w[0] + 1 == w[1]));
                assert_eq!(buf.latest().copied(), total.checked_sub(1));
            }
        }
    }

    #[test]
    fn test_version_counts_every_push() {
        let mut buf = RingBuffer::new(2);
        assert_eq!(buf.version(), 0);
        for i in 0..10 {
            buf.push(i);
        }
        assert_eq!(buf.version(), 10);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_no_reallocation() {
        let mut buf = RingBuffer::new(4);
        let before = buf.slots.capacity();
        for i in 0..100 {
            buf.push(i);
        }
        assert_eq!(buf.slots.capacity(), before);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn test_snapshot_does_not_alias() {
        let mut buf = RingBuffer::new(2);
        buf.push(1);
        buf.push(2);
        let snapshot = buf.to_vec();
        buf.push(3);
        assert_eq!(snapshot, vec![1, 2]);
        assert_eq!(buf.to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buf = RingBuffer::new(0);
        buf.push('x');
        buf.push('y');
        assert_eq!(buf.to_vec(), vec!['y']);
    }

    #[test]
    fn test_history_point_projection() {
        let Inbound::Frame(ServerFrame::Update(snapshot)) =
            decode_frame(&update_frame(3, 61.5)).unwrap()
        else {
            panic!("expected update");
        };
        let point = HistoryPoint::from(snapshot.as_ref());
        assert_eq!(point.cpu_load, 61.5);
        assert_eq!(point.cpu_temp, Some(54.5));
        assert_eq!(point.memory_total, 32_000_000_000);
        assert_eq!(point.disk_read, 120.0);
        assert_eq!(point.disk_write, 55.0);
        assert_eq!(point.gpu_util, Some(12.0));
        assert_eq!(point.timestamp, 1_700_000_003.0);
    }
}
