//! Telemetry store
//!
//! The single owner of client-side telemetry state. Construct one per
//! application with [`TelemetryStore::start`] and hand it (or an `Arc` of it)
//! to whatever renders. Consumers:
//! - send the two verbs, [`TelemetryStore::connect`] / [`TelemetryStore::disconnect`]
//! - read fields directly (`status`, `static_info`, `live_data`, ...)
//! - pull [`TelemetryStore::history`] only when they actually render, keyed
//!   off the cheap [`TelemetryStore::history_version`]
//! - or subscribe to a narrow projection with [`TelemetryStore::select`],
//!   which only wakes when the projected value changes
//!
//! [`TelemetryStore::shutdown`] stops the driver, cancels timers and closes
//! the socket. Dropping the store does the same without waiting.

use crate::config::StreamConfig;
use crate::connection::{Command, Connector, Driver, DriverEvent, WebSocketConnector};
use crate::engine::{ConnectionStatus, Engine, Epoch};
use crate::error::{PulseError, Result};
use crate::history::HistoryPoint;
use crate::stats::ConnectionStats;
use crate::wire::{LiveSnapshot, StaticInfo};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Published state, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct StoreView {
    pub status: ConnectionStatus,
    pub epoch: Epoch,
    pub static_info: Option<Arc<StaticInfo>>,
    pub live: Option<Arc<LiveSnapshot>>,
    pub history_version: u64,
    pub last_error: Option<String>,
    pub retry_count: u32,
}

impl StoreView {
    /// True when nothing a subscriber could observe has changed
    pub fn same_as(&self, other: &StoreView) -> bool {
        self.status == other.status
            && self.epoch == other.epoch
            && self.history_version == other.history_version
            && self.retry_count == other.retry_count
            && self.last_error == other.last_error
            && same_arc(&self.static_info, &other.static_info)
            && same_arc(&self.live, &other.live)
    }
}

fn same_arc<T>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// State shared between the store handle and the driver task
pub(crate) struct Shared {
    engine: Mutex<Engine>,
    view_tx: watch::Sender<StoreView>,
}

impl Shared {
    pub(crate) fn engine(&self) -> MutexGuard<'_, Engine> {
        // Engine handlers do not panic mid-update; a poisoned lock still holds consistent state
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Notify subscribers if the engine changed since the last publish
    pub(crate) fn publish(&self) {
        let next = self.engine().view();
        self.view_tx.send_if_modified(|current| {
            if current.same_as(&next) {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

pub struct TelemetryStore {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<DriverEvent>,
    driver: Option<JoinHandle<()>>,
    config: StreamConfig,
}

impl TelemetryStore {
    /// Validate `config` and start a store backed by a WebSocket transport.
    ///
    /// Must be called inside a tokio runtime. The store starts
    /// disconnected; call [`TelemetryStore::connect`] to begin streaming.
    pub fn start(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_connector(config, Arc::new(WebSocketConnector)))
    }

    /// Start a store over a custom transport
    pub fn with_connector(config: StreamConfig, connector: Arc<dyn Connector>) -> Self {
        let engine = Engine::new(&config);
        let (view_tx, _) = watch::channel(engine.view());
        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
            view_tx,
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver::new(Arc::clone(&shared), connector, tx.clone(), rx);
        let handle = tokio::spawn(driver.run());

        Self {
            shared,
            commands: tx,
            driver: Some(handle),
            config,
        }
    }

    pub fn connect(&self) -> Result<()> {
        self.command(Command::Connect)
    }

    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect)
    }

    /// Disconnect, stop the driver and wait for it to finish
    pub async fn shutdown(mut self) -> Result<()> {
        self.command(Command::Shutdown)?;
        if let Some(driver) = self.driver.take() {
            driver
                .await
                .map_err(|e| PulseError::Transport(format!("driver task failed: {}", e)))?;
        }
        Ok(())
    }

    fn command(&self, command: Command) -> Result<()> {
        self.commands
            .send(DriverEvent::Command(command))
            .map_err(|_| PulseError::StoreClosed)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn status(&self) -> ConnectionStatus {
        self.shared.engine().status()
    }

    pub fn static_info(&self) -> Option<Arc<StaticInfo>> {
        self.shared.engine().static_info()
    }

    /// Latest applied snapshot, if any update has arrived
    pub fn live_data(&self) -> Option<Arc<LiveSnapshot>> {
        self.shared.engine().live_data()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.engine().last_error().map(str::to_owned)
    }

    pub fn retry_count(&self) -> u32 {
        self.shared.engine().retry_count()
    }

    /// Chronological copy of the history window. O(n); call at render time.
    pub fn history(&self) -> Vec<HistoryPoint> {
        self.shared.engine().history().to_vec()
    }

    /// Newest history point without copying the window
    pub fn latest_point(&self) -> Option<HistoryPoint> {
        self.shared.engine().history().latest().copied()
    }

    pub fn history_len(&self) -> usize {
        self.shared.engine().history().len()
    }

    /// Bumped on every history push
    pub fn history_version(&self) -> u64 {
        self.shared.engine().history().version()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.shared.engine().stats().clone()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Last published view
    pub fn view(&self) -> StoreView {
        self.shared.view_tx.borrow().clone()
    }

    /// Raw change feed, woken on every published change
    pub fn subscribe(&self) -> watch::Receiver<StoreView> {
        self.shared.view_tx.subscribe()
    }

    /// Subscribe to one projection of the state
    ///
    /// ```ignore
    /// let mut load = store.select(selectors::cpu_load);
    /// while let Ok(value) = load.changed().await {
    ///     redraw_gauge(value);
    /// }
    /// ```
    pub fn select<T, F>(&self, selector: F) -> Selection<T, F>
    where
        T: Clone + PartialEq,
        F: Fn(&StoreView) -> T,
    {
        Selection::new(self.subscribe(), selector)
    }
}

impl Drop for TelemetryStore {
    fn drop(&mut self) {
        if self.driver.is_some() {
            let _ = self.commands.send(DriverEvent::Command(Command::Shutdown));
        }
    }
}

/// A value-equality subscription to one projection of [`StoreView`]
pub struct Selection<T, F> {
    rx: watch::Receiver<StoreView>,
    selector: F,
    current: T,
}

impl<T, F> Selection<T, F>
where
    T: Clone + PartialEq,
    F: Fn(&StoreView) -> T,
{
    pub fn new(mut rx: watch::Receiver<StoreView>, selector: F) -> Self {
        let current = selector(&rx.borrow_and_update());
        Self {
            rx,
            selector,
            current,
        }
    }

    pub fn get(&self) -> &T {
        &self.current
    }

    /// Wait until the projected value differs from the last one seen
    pub async fn changed(&mut self) -> Result<T> {
        loop {
            self.rx
                .changed()
                .await
                .map_err(|_| PulseError::StoreClosed)?;
            let next = (self.selector)(&self.rx.borrow_and_update());
            if next != self.current {
                self.current = next.clone();
                return Ok(next);
            }
        }
    }

    /// Wait until the projected value satisfies `predicate`
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Result<T> {
        while !predicate(&self.current) {
            self.changed().await?;
        }
        Ok(self.current.clone())
    }
}
