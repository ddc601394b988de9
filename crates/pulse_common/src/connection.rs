//! Connection driver
//!
//! Runs the [`Engine`] on a single tokio task. Commands, transport events and
//! timer ticks all arrive on one queue and are handled one at a time, so the
//! engine never sees two events interleave. The driver carries out the
//! engine's [`Effect`]s: it owns the socket task for the current epoch, the
//! retry timer and the heartbeat ticker.
//!
//! The socket itself sits behind [`Connector`] so tests can script transport
//! behaviour; [`WebSocketConnector`] is the production implementation.

use crate::engine::{Effect, Engine, Epoch, TransportEvent};
use crate::store::Shared;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

/// User-facing verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    /// Disconnect and stop the driver
    Shutdown,
}

/// Everything the driver reacts to
#[derive(Debug)]
pub enum DriverEvent {
    Command(Command),
    Transport { epoch: Epoch, event: TransportEvent },
    RetryDue { epoch: Epoch },
    HeartbeatDue { epoch: Epoch },
}

/// Sink a transport reports into, pre-tagged with its epoch
#[derive(Debug, Clone)]
pub struct TransportEvents {
    epoch: Epoch,
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl TransportEvents {
    pub fn new(epoch: Epoch, tx: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Returns false once the driver has stopped
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(DriverEvent::Transport {
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }
}

/// Instructions from the driver to a transport task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    /// Close quietly: no further events may be emitted
    Close,
}

/// Driver-side handle to one transport task
#[derive(Debug)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl TransportHandle {
    pub fn new(outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { outbound }
    }

    fn send(&self, text: String) {
        if self.outbound.send(Outbound::Text(text)).is_err() {
            debug!("Transport already gone, dropping outbound frame");
        }
    }

    fn close(self) {
        // The task finishes the close handshake on its own
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Opens transports on behalf of the driver
pub trait Connector: Send + Sync + 'static {
    /// Begin connecting to `url`. Must not block: report `Opened`,
    /// `OpenFailed`, messages and `Closed` through `events`, and stop
    /// emitting once `Outbound::Close` arrives or the sender is dropped.
    fn open(&self, url: &str, events: TransportEvents) -> TransportHandle;
}

/// tokio-tungstenite transport
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(&self, url: &str, events: TransportEvents) -> TransportHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(url.to_string(), events, rx));
        TransportHandle::new(tx)
    }
}

async fn run_socket(
    url: String,
    events: TransportEvents,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                events.emit(TransportEvent::OpenFailed(e.to_string()));
                return;
            }
        },
        // Nothing is sent before open, so anything here is a detach
        _ = outbound.recv() => {
            debug!(epoch = events.epoch(), "Transport detached while connecting");
            return;
        }
    };

    if !events.emit(TransportEvent::Opened) {
        return;
    }

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    events.emit(TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| {
                        let reason: &str = &f.reason;
                        reason.to_owned()
                    });
                    events.emit(TransportEvent::Closed { reason });
                    return;
                }
                Some(Ok(Message::Binary(_))) => {
                    debug!(epoch = events.epoch(), "Ignoring binary frame");
                }
                // Control frames are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    events.emit(TransportEvent::Error(e.to_string()));
                    events.emit(TransportEvent::Closed { reason: Some(e.to_string()) });
                    return;
                }
                None => {
                    events.emit(TransportEvent::Closed { reason: None });
                    return;
                }
            },
            instruction = outbound.recv() => match instruction {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        events.emit(TransportEvent::Error(e.to_string()));
                        events.emit(TransportEvent::Closed { reason: Some(e.to_string()) });
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = write.close().await {
                        debug!(epoch = events.epoch(), error = %e, "Close handshake failed");
                    }
                    return;
                }
            },
        }
    }
}

/// The task that owns the socket and timers
pub(crate) struct Driver {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    events_rx: mpsc::UnboundedReceiver<DriverEvent>,
    transport: Option<(Epoch, TransportHandle)>,
    retry_timer: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl Driver {
    pub(crate) fn new(
        shared: Arc<Shared>,
        connector: Arc<dyn Connector>,
        events_tx: mpsc::UnboundedSender<DriverEvent>,
        events_rx: mpsc::UnboundedReceiver<DriverEvent>,
    ) -> Self {
        Self {
            shared,
            connector,
            events_tx,
            events_rx,
            transport: None,
            retry_timer: None,
            heartbeat: None,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(event) = self.events_rx.recv().await {
            let stop = matches!(event, DriverEvent::Command(Command::Shutdown));
            let effects = {
                let mut engine = self.shared.engine();
                dispatch(&mut engine, event, Instant::now())
            };
            for effect in effects {
                self.apply(effect);
            }
            self.shared.publish();
            if stop {
                break;
            }
        }

        self.cancel_timers();
        if let Some((_, handle)) = self.transport.take() {
            handle.close();
        }
        debug!("Connection driver stopped");
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Open { epoch, url } => {
                let events = TransportEvents::new(epoch, self.events_tx.clone());
                let handle = self.connector.open(&url, events);
                if let Some((old_epoch, old)) = self.transport.replace((epoch, handle)) {
                    debug!(epoch = old_epoch, "Replacing transport");
                    old.close();
                }
            }
            Effect::Close { epoch } => match self.transport.take() {
                Some((current, handle)) if current == epoch => handle.close(),
                other => self.transport = other,
            },
            Effect::Send { epoch, text } => match &self.transport {
                Some((current, handle)) if *current == epoch => handle.send(text),
                _ => debug!(epoch, "No transport for outbound frame"),
            },
            Effect::ScheduleRetry { epoch, delay } => {
                let tx = self.events_tx.clone();
                let timer = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(DriverEvent::RetryDue { epoch });
                });
                if let Some(old) = self.retry_timer.replace(timer) {
                    old.abort();
                }
            }
            Effect::StartHeartbeat { epoch, interval } => {
                let tx = self.events_tx.clone();
                let interval = interval.max(Duration::from_millis(1));
                let ticker = tokio::spawn(async move {
                    let start = tokio::time::Instant::now() + interval;
                    let mut ticks = tokio::time::interval_at(start, interval);
                    loop {
                        ticks.tick().await;
                        if tx.send(DriverEvent::HeartbeatDue { epoch }).is_err() {
                            break;
                        }
                    }
                });
                if let Some(old) = self.heartbeat.replace(ticker) {
                    old.abort();
                }
            }
            Effect::CancelTimers => self.cancel_timers(),
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
        if let Some(ticker) = self.heartbeat.take() {
            ticker.abort();
        }
    }
}

fn dispatch(engine: &mut Engine, event: DriverEvent, now: Instant) -> Vec<Effect> {
    match event {
        DriverEvent::Command(Command::Connect) => engine.connect(),
        DriverEvent::Command(Command::Disconnect | Command::Shutdown) => engine.disconnect(),
        DriverEvent::Transport { epoch, event } => engine.handle_transport(epoch, event, now),
        DriverEvent::RetryDue { epoch } => engine.handle_retry_due(epoch),
        DriverEvent::HeartbeatDue { epoch } => engine.handle_heartbeat_due(epoch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_events_are_tagged() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = TransportEvents::new(7, tx);
        assert!(events.emit(TransportEvent::Opened));

        match rx.try_recv().unwrap() {
            DriverEvent::Transport { epoch, event } => {
                assert_eq!(epoch, 7);
                assert_eq!(event, TransportEvent::Opened);
            }
            other => panic!("unexpected {:?}", other),
        }

        drop(rx);
        assert!(!events.emit(TransportEvent::Closed { reason: None }));
    }

    #[test]
    fn test_handle_close_sends_close_instruction() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = TransportHandle::new(tx);
        handle.send("ping".to_string());
        handle.close();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("ping".to_string()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }
}
