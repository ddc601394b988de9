//! Named selectors over [`StoreView`]
//!
//! Each selector projects one small field and falls back to a fixed default
//! while no snapshot exists, so a [`crate::store::Selection`] built on it only
//! wakes when that field actually changes. Numeric fields default to zero;
//! fields the producer may omit stay `Option`.

use crate::engine::ConnectionStatus;
use crate::store::StoreView;
use crate::wire::LiveSnapshot;

fn live<T>(view: &StoreView, default: T, project: impl FnOnce(&LiveSnapshot) -> T) -> T {
    view.live.as_deref().map_or(default, project)
}

// ============================================================================
// CONNECTION
// ============================================================================

pub fn status(view: &StoreView) -> ConnectionStatus {
    view.status
}

pub fn last_error(view: &StoreView) -> Option<String> {
    view.last_error.clone()
}

pub fn retry_count(view: &StoreView) -> u32 {
    view.retry_count
}

/// Changes once per applied update; pull the history only when this moves
pub fn history_version(view: &StoreView) -> u64 {
    view.history_version
}

pub fn hostname(view: &StoreView) -> Option<String> {
    view.static_info.as_ref().map(|s| s.host.hostname.clone())
}

// ============================================================================
// LIVE SNAPSHOT
// ============================================================================

pub fn cpu_load(view: &StoreView) -> f64 {
    live(view, 0.0, |s| s.cpu.load)
}

pub fn cpu_temp(view: &StoreView) -> Option<f64> {
    live(view, None, |s| s.cpu.temperature)
}

pub fn cpu_frequency(view: &StoreView) -> Option<f64> {
    live(view, None, |s| s.cpu.frequency_mhz)
}

pub fn memory_percent(view: &StoreView) -> f64 {
    live(view, 0.0, |s| s.memory.percent)
}

pub fn memory_used(view: &StoreView) -> u64 {
    live(view, 0, |s| s.memory.used)
}

pub fn network_interface(view: &StoreView) -> Option<String> {
    live(view, None, |s| Some(s.network.interface.clone()))
}

pub fn network_rx(view: &StoreView) -> f64 {
    live(view, 0.0, |s| s.network.rx_rate)
}

pub fn network_tx(view: &StoreView) -> f64 {
    live(view, 0.0, |s| s.network.tx_rate)
}

pub fn gpu_utilization(view: &StoreView) -> Option<f64> {
    live(view, None, |s| s.gpu.as_ref().map(|g| g.utilization))
}

pub fn gpu_temp(view: &StoreView) -> Option<f64> {
    live(view, None, |s| s.gpu.as_ref().and_then(|g| g.temperature))
}

pub fn battery_percent(view: &StoreView) -> Option<f64> {
    live(view, None, |s| s.battery.percent)
}

pub fn battery_charging(view: &StoreView) -> bool {
    live(view, false, |s| s.battery.charging)
}

pub fn anomaly_score(view: &StoreView) -> f64 {
    live(view, 0.0, |s| s.anomaly.score)
}

pub fn process_count(view: &StoreView) -> u32 {
    live(view, 0, |s| s.system.process_count)
}

pub fn uptime_secs(view: &StoreView) -> u64 {
    live(view, 0, |s| s.system.uptime_secs)
}

pub fn update_count(view: &StoreView) -> u64 {
    live(view, 0, |s| s.update_count)
}

pub fn top_process_names(view: &StoreView) -> Vec<String> {
    live(view, Vec::new(), |s| {
        s.top_processes.iter().map(|p| p.name.clone()).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::fixtures::{init_frame, update_frame};
    use crate::wire::{decode_frame, Inbound, ServerFrame, StaticInfo};
    use std::sync::Arc;

    fn view_with_update(count: u64, load: f64) -> StoreView {
        let snapshot = match decode_frame(&update_frame(count, load)).unwrap() {
            Inbound::Frame(ServerFrame::Update(snapshot)) => snapshot,
            other => panic!("unexpected {:?}", other),
        };
        StoreView {
            status: ConnectionStatus::Connected,
            live: Some(Arc::from(snapshot)),
            ..StoreView::default()
        }
    }

    #[test]
    fn test_defaults_without_snapshot() {
        let view = StoreView::default();
        assert_eq!(status(&view), ConnectionStatus::Disconnected);
        assert_eq!(cpu_load(&view), 0.0);
        assert_eq!(cpu_temp(&view), None);
        assert_eq!(memory_used(&view), 0);
        assert_eq!(gpu_utilization(&view), None);
        assert!(!battery_charging(&view));
        assert!(top_process_names(&view).is_empty());
        assert_eq!(hostname(&view), None);
    }

    #[test]
    fn test_projects_live_fields() {
        let view = view_with_update(7, 33.0);
        assert_eq!(cpu_load(&view), 33.0);
        assert_eq!(cpu_temp(&view), Some(54.5));
        assert_eq!(cpu_frequency(&view), Some(3800.0));
        assert_eq!(memory_percent(&view), 25.0);
        assert_eq!(network_interface(&view).as_deref(), Some("enp5s0"));
        assert_eq!(network_rx(&view), 1200.0);
        assert_eq!(network_tx(&view), 300.0);
        assert_eq!(gpu_utilization(&view), Some(12.0));
        assert_eq!(gpu_temp(&view), Some(48.0));
        assert_eq!(battery_percent(&view), None);
        assert_eq!(process_count(&view), 312);
        assert_eq!(uptime_secs(&view), 3600);
        assert_eq!(update_count(&view), 7);
        assert_eq!(top_process_names(&view), vec!["firefox".to_string()]);
    }

    #[test]
    fn test_equal_inputs_give_equal_outputs() {
        // Two distinct snapshots with the same load project to the same value
        let a = view_with_update(1, 50.0);
        let b = view_with_update(2, 50.0);
        assert!(!a.same_as(&b));
        assert_eq!(cpu_load(&a), cpu_load(&b));
        assert_ne!(update_count(&a), update_count(&b));
    }

    #[test]
    fn test_hostname_from_static_info() {
        let init = match decode_frame(&init_frame("atlas")).unwrap() {
            Inbound::Frame(ServerFrame::Init(init)) => init,
            other => panic!("unexpected {:?}", other),
        };
        let view = StoreView {
            static_info: Some(Arc::new(StaticInfo::from(init))),
            ..StoreView::default()
        };
        assert_eq!(hostname(&view).as_deref(), Some("atlas"));
    }
}
