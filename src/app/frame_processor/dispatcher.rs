// SPDX-License-Identifier: GPL-3.0-only

//! Delivery of tracked-identity events to the registered sink
//!
//! Detection engines report [`TrackEvent`]s from whatever thread they run
//! on. Those events are funneled through a channel into one dedicated
//! dispatch thread, which is the only thread that ever calls into a sink.
//! The sink can therefore assume it is never entered concurrently and sees
//! events in emission order.
//!
//! ```text
//! engine thread ──TrackEventSender::send──▶ channel ──▶ barcode-dispatch thread
//!   TrackerFactory::create (NewItem)                     │ BarcodeTracker::on_new_item / on_done
//!                                                        ▼
//!                                                     EventSink::success
//! ```
//!
//! A tracker is created on the engine's thread when the identity is
//! reported, and stays bound to the sink registered at that moment.
//! Replacing the sink later only affects codes detected from then on, even
//! if earlier events are still queued.

use super::types::{BarcodeEvent, TrackEvent};
use crate::constants::DISPATCH_THREAD_NAME;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

/// Consumer of barcode events
///
/// Only ever called from the dispatch thread.
pub trait EventSink: Send + Sync {
    /// Deliver one event
    fn success(&self, event: BarcodeEvent);
}

/// Sink shared between the factory and the trackers bound to it
pub type SharedSink = Arc<dyn EventSink>;

impl EventSink for UnboundedSender<BarcodeEvent> {
    fn success(&self, event: BarcodeEvent) {
        if self.send(event).is_err() {
            trace!("Barcode event receiver dropped");
        }
    }
}

/// Adapter turning a closure into an [`EventSink`]
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(BarcodeEvent) + Send + Sync,
{
    fn success(&self, event: BarcodeEvent) {
        (self.0)(event)
    }
}

/// Wrap a closure as a shareable sink
pub fn sink_fn<F>(f: F) -> SharedSink
where
    F: Fn(BarcodeEvent) + Send + Sync + 'static,
{
    Arc::new(FnSink(f))
}

/// Per-identity event forwarder
///
/// Records the identity on its first detection and reports it to the sink
/// it was created with. Value changes while tracked are not reported.
pub struct BarcodeTracker {
    id: Option<i32>,
    sink: Option<SharedSink>,
}

impl BarcodeTracker {
    /// Create a tracker bound to `sink`
    pub fn new(sink: Option<SharedSink>) -> Self {
        Self { id: None, sink }
    }

    /// First detection of an identity
    pub fn on_new_item(&mut self, id: i32, value: String) {
        self.id = Some(id);
        self.deliver(BarcodeEvent::detected(id, value));
    }

    /// The identity is gone
    pub fn on_done(&mut self) {
        match self.id {
            Some(id) => self.deliver(BarcodeEvent::lost(id)),
            None => warn!("Tracker finished before any item was reported"),
        }
    }

    /// Identity this tracker follows, once known
    pub fn id(&self) -> Option<i32> {
        self.id
    }

    fn deliver(&self, event: BarcodeEvent) {
        match &self.sink {
            Some(sink) => sink.success(event),
            None => debug!(id = event.id, "No sink bound to tracker, dropping event"),
        }
    }
}

/// Creates one tracker per newly detected identity
///
/// Cheap to clone; clones share the registered sink.
#[derive(Clone, Default)]
pub struct TrackerFactory {
    sink: Arc<Mutex<Option<SharedSink>>>,
}

impl TrackerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sink for trackers created from now on
    pub fn set_sink(&self, sink: Option<SharedSink>) {
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    /// Whether a sink is currently registered
    pub fn has_sink(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Create a tracker bound to the currently registered sink
    pub fn create(&self) -> BarcodeTracker {
        let sink = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        BarcodeTracker::new(sink)
    }
}

/// Message on the dispatch channel
enum Routed {
    /// New identity, with the tracker created when it was reported
    New {
        id: i32,
        value: String,
        tracker: BarcodeTracker,
    },
    Done {
        id: i32,
    },
}

impl Routed {
    fn into_event(self) -> TrackEvent {
        match self {
            Routed::New { id, value, .. } => TrackEvent::NewItem { id, value },
            Routed::Done { id } => TrackEvent::Done { id },
        }
    }
}

/// Handle engines report identity lifecycle through
///
/// Cloneable and callable from any thread. Sending never blocks.
#[derive(Clone)]
pub struct TrackEventSender {
    sender: UnboundedSender<Routed>,
    factory: TrackerFactory,
}

impl TrackEventSender {
    /// Report an identity event
    ///
    /// A new identity gets its tracker right here, bound to the sink
    /// registered at the time of the call. Fails only once the dispatch
    /// thread is gone, handing the event back.
    pub fn send(&self, event: TrackEvent) -> Result<(), SendError<TrackEvent>> {
        trace!(id = event.id(), "Queueing track event");
        let routed = match event {
            TrackEvent::NewItem { id, value } => Routed::New {
                id,
                value,
                tracker: self.factory.create(),
            },
            TrackEvent::Done { id } => Routed::Done { id },
        };
        self.sender
            .send(routed)
            .map_err(|SendError(routed)| SendError(routed.into_event()))
    }
}

/// Receiving half of the dispatch channel
pub(crate) struct TrackEventReceiver {
    receiver: UnboundedReceiver<Routed>,
}

impl TrackEventReceiver {
    fn blocking_recv(&mut self) -> Option<Routed> {
        self.receiver.blocking_recv()
    }

    /// Next queued event, without its tracker
    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<TrackEvent> {
        self.receiver.try_recv().ok().map(Routed::into_event)
    }
}

/// Create a dispatch channel whose sender creates trackers from `factory`
pub(crate) fn track_channel(factory: TrackerFactory) -> (TrackEventSender, TrackEventReceiver) {
    let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
    (
        TrackEventSender { sender, factory },
        TrackEventReceiver { receiver },
    )
}

/// Routing state owned by the dispatch thread
#[derive(Default)]
struct DispatchLoop {
    trackers: HashMap<i32, BarcodeTracker>,
}

impl DispatchLoop {
    fn handle(&mut self, routed: Routed) {
        match routed {
            Routed::New {
                id,
                value,
                mut tracker,
            } => {
                if self.trackers.contains_key(&id) {
                    warn!(id, "Identity reported new twice, ignoring");
                    return;
                }
                tracker.on_new_item(id, value);
                self.trackers.insert(id, tracker);
            }
            Routed::Done { id } => match self.trackers.remove(&id) {
                Some(mut tracker) => tracker.on_done(),
                None => warn!(id, "Done for unknown identity, ignoring"),
            },
        }
    }

    fn run(mut self, mut events: TrackEventReceiver) {
        debug!("Dispatch thread started");
        while let Some(routed) = events.blocking_recv() {
            self.handle(routed);
        }
        if !self.trackers.is_empty() {
            debug!(
                count = self.trackers.len(),
                "Event source closed with identities still tracked"
            );
        }
        info!("Dispatch thread exiting");
    }
}

/// Owner of the dispatch thread
///
/// The thread runs until every [`TrackEventSender`] handed out by
/// [`EventDispatcher::spawn`] has been dropped.
pub struct EventDispatcher {
    factory: TrackerFactory,
    thread_handle: Option<JoinHandle<()>>,
}

impl EventDispatcher {
    /// Start the dispatch thread
    ///
    /// Returns the dispatcher and the sender engines report through.
    pub fn spawn(factory: TrackerFactory) -> std::io::Result<(Self, TrackEventSender)> {
        let (sender, receiver) = track_channel(factory.clone());
        let dispatch_loop = DispatchLoop::default();

        let thread_handle = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_string())
            .spawn(move || dispatch_loop.run(receiver))?;

        Ok((
            Self {
                factory,
                thread_handle: Some(thread_handle),
            },
            sender,
        ))
    }

    /// Factory whose sink new trackers are bound to
    pub fn factory(&self) -> &TrackerFactory {
        &self.factory
    }

    /// Wait for the dispatch thread to drain and exit
    ///
    /// Blocks until all senders are gone.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Dispatch thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.join();
    }
}
