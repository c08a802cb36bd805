// SPDX-License-Identifier: GPL-3.0-only
//! Frame scheduling between the camera and the detection engine
//!
//! Frames are submitted from the camera's delivery thread and processed on a
//! single worker thread. Only the newest submitted frame is kept: a frame
//! that arrives while the worker is busy replaces the previous pending one,
//! so memory stays bounded and a slow engine simply sees fewer frames.
//!
//! # Buffers
//!
//! ```text
//!  submit_image ──capture──▶ pending ─┐
//!                                     │ swap (under lock, no copy)
//!                        processing ◀─┘
//!                            │ scaled_from (F=2)
//!                            ▼
//!                          scaled ──descriptor──▶ DetectionEngine
//! ```
//!
//! The pending slot lives behind the scheduler lock. The processing and
//! scaled slots, together with the engine, are moved into the worker thread
//! when it starts and handed back through its join handle.
//!
//! # State handshake
//!
//! `start`, `stop`, `pause` and `resume` post a requested state and block
//! until the worker has applied it. Calls that make no sense in the current
//! state return immediately without changing anything.

use super::dispatcher::{EventDispatcher, SharedSink, TrackerFactory};
use super::frame_buffer::FrameBuffer;
use super::tasks::DetectionEngine;
use super::types::ScanState;
use crate::backends::camera::types::{FrameRotation, SourceImage};
use crate::constants::WORKER_THREAD_NAME;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// State shared between control calls, producers and the worker
struct Inner {
    state: ScanState,
    requested: Option<ScanState>,
    /// True iff `pending_frame` holds a frame the worker has not taken yet
    pending: bool,
    pending_frame: FrameBuffer,
    next_frame_id: u32,
}

struct Shared {
    inner: Mutex<Inner>,
    cond: Condvar,
    /// Origin of frame timestamps
    epoch: Instant,
}

impl Shared {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ScanState::Stopped,
                requested: None,
                pending: false,
                pending_frame: FrameBuffer::new(),
                next_frame_id: 0,
            }),
            cond: Condvar::new(),
            epoch: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait on the condition variable from a control call
    fn wait<'a>(&self, guard: MutexGuard<'a, Inner>) -> MutexGuard<'a, Inner> {
        self.cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait on the condition variable from the worker.
    ///
    /// A poisoned lock means another thread panicked inside the critical
    /// section; the wait is treated as interrupted and the pipeline halts.
    fn worker_wait<'a>(&self, guard: MutexGuard<'a, Inner>) -> MutexGuard<'a, Inner> {
        match self.cond.wait(guard) {
            Ok(guard) => guard,
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                error!("Scanner wait interrupted, stopping");
                guard.state = ScanState::Stopped;
                guard.requested = None;
                self.cond.notify_all();
                guard
            }
        }
    }
}

/// Apply a requested transition, if any, and wake waiters
fn apply_request(shared: &Shared, inner: &mut Inner) {
    if let Some(next) = inner.requested.take() {
        debug!(from = %inner.state, to = %next, "Scanner state change");
        inner.state = next;
        shared.cond.notify_all();
    }
}

/// Everything the worker owns while it runs
struct WorkerSlots {
    processing: FrameBuffer,
    scaled: FrameBuffer,
    engine: Box<dyn DetectionEngine>,
}

/// Control-side bookkeeping, serialized by its own mutex
struct Control {
    worker: Option<JoinHandle<WorkerSlots>>,
    /// Present whenever no worker holds them
    slots: Option<WorkerSlots>,
}

impl Control {
    /// Join a worker that has exited and take its slots back.
    ///
    /// The engine is released, since a worker only exits after the
    /// pipeline stopped.
    fn reap(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        match handle.join() {
            Ok(mut slots) => {
                slots.engine.release();
                self.slots = Some(slots);
            }
            Err(e) => {
                error!(
                    "Barcode worker panicked, engine lost: {}",
                    panic_message(e.as_ref())
                );
            }
        }
    }
}

/// Single-worker frame scheduler
///
/// All methods take `&self`; wrap the scheduler in an [`Arc`] to drive it
/// from a control thread and a frame-delivery thread at the same time.
pub struct FrameScheduler {
    shared: Arc<Shared>,
    control: Mutex<Control>,
    factory: TrackerFactory,
    dispatcher: Option<EventDispatcher>,
}

impl FrameScheduler {
    /// Create a stopped scheduler
    ///
    /// `engine` must report through a sender obtained from `dispatcher`.
    /// Dropping the scheduler waits for the dispatcher to drain, which only
    /// happens once every clone of that sender is gone.
    pub fn new(engine: impl DetectionEngine, dispatcher: EventDispatcher) -> Self {
        let factory = dispatcher.factory().clone();
        Self {
            shared: Arc::new(Shared::new()),
            control: Mutex::new(Control {
                worker: None,
                slots: Some(WorkerSlots {
                    processing: FrameBuffer::new(),
                    scaled: FrameBuffer::new(),
                    engine: Box::new(engine),
                }),
            }),
            factory,
            dispatcher: Some(dispatcher),
        }
    }

    /// Current state
    pub fn state(&self) -> ScanState {
        self.shared.lock().state
    }

    /// Register the consumer for identities detected from now on
    pub fn set_sink(&self, sink: SharedSink) {
        self.factory.set_sink(Some(sink));
    }

    /// Unregister the consumer; identities already tracked keep theirs
    pub fn clear_sink(&self) {
        self.factory.set_sink(None);
    }

    /// Spawn the worker and wait until it runs. No-op unless stopped.
    pub fn start(&self) {
        let mut control = self.lock_control();
        if self.shared.lock().state != ScanState::Stopped {
            debug!("Scanner already started");
            return;
        }

        // A worker that halted on its own is still waiting to be joined
        control.reap();
        let Some(slots) = control.slots.take() else {
            error!("Scanner has no detection engine left, cannot start");
            return;
        };
        if !self.factory.has_sink() {
            warn!("Starting scanner without a sink, detections will be dropped");
        }

        let mut inner = self.shared.lock();
        inner.requested = Some(ScanState::Running);

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_loop(shared, slots));

        match spawned {
            Ok(handle) => {
                control.worker = Some(handle);
                let state = self.await_transition(inner);
                info!(%state, "Scanner started");
            }
            Err(e) => {
                inner.requested = None;
                error!(error = %e, "Failed to spawn barcode worker");
            }
        }
    }

    /// Stop the worker, release the engine and join the thread.
    /// No-op when already stopped.
    ///
    /// An engine call in progress is not interrupted; this returns once it
    /// has finished.
    pub fn stop(&self) {
        let mut control = self.lock_control();
        let mut inner = self.shared.lock();
        if inner.state == ScanState::Stopped {
            drop(inner);
            // The worker may have halted on its own
            control.reap();
            debug!("Scanner already stopped");
            return;
        }

        inner.requested = Some(ScanState::Stopped);
        self.await_transition(inner);

        control.reap();
        info!("Scanner stopped");
    }

    /// Pause frame processing. No-op unless running.
    pub fn pause(&self) {
        self.transition(ScanState::Running, ScanState::Paused);
    }

    /// Resume frame processing. No-op unless paused.
    pub fn resume(&self) {
        self.transition(ScanState::Paused, ScanState::Running);
    }

    /// Offer a camera frame to the scanner
    ///
    /// Replaces any frame still waiting to be processed. Frames that are not
    /// planar YUV 4:2:0 are dropped. Returns whether the frame was kept.
    pub fn submit_image(&self, image: &SourceImage<'_>, orientation_degrees: i32) -> bool {
        let rotation = FrameRotation::from_orientation(orientation_degrees);

        let mut inner = self.shared.lock();
        inner.pending = false;
        let frame_id = inner.next_frame_id;
        inner.next_frame_id = inner.next_frame_id.wrapping_add(1);
        let timestamp_ms = self.shared.epoch.elapsed().as_millis() as u64;

        if let Err(e) = inner.pending_frame.capture(image) {
            trace!(frame_id, error = %e, "Dropping frame");
            return false;
        }
        inner.pending_frame.set_metadata(frame_id, timestamp_ms, rotation);
        inner.pending = true;
        self.shared.cond.notify_all();

        trace!(frame_id, %rotation, "Frame submitted");
        true
    }

    fn transition(&self, from: ScanState, to: ScanState) {
        let _control = self.lock_control();
        let mut inner = self.shared.lock();
        if inner.state != from {
            debug!(state = %inner.state, requested = %to, "Ignoring scanner transition");
            return;
        }

        inner.requested = Some(to);
        self.await_transition(inner);
    }

    /// Wake the worker and block until it has consumed the request.
    ///
    /// The request is consumed either by being applied or by the worker
    /// halting, so this never outlives the worker.
    fn await_transition(&self, mut inner: MutexGuard<'_, Inner>) -> ScanState {
        self.shared.cond.notify_all();
        while inner.requested.is_some() {
            inner = self.shared.wait(inner);
        }
        inner.state
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.stop();

        let control = self
            .control
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        control.reap();
        // Dropping the engine drops its event sender, which lets the
        // dispatcher drain and exit
        control.slots = None;

        if let Some(mut dispatcher) = self.dispatcher.take() {
            dispatcher.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>, mut slots: WorkerSlots) -> WorkerSlots {
    {
        let mut inner = shared.lock();
        inner.state = ScanState::Running;
        inner.requested = None;
        shared.cond.notify_all();
    }
    info!("Barcode worker started");

    loop {
        {
            let mut inner = shared.lock();
            // Checked before waiting too: with frames arriving continuously
            // the wait below may never be entered
            apply_request(&shared, &mut inner);
            while (!inner.pending && inner.state == ScanState::Running)
                || inner.state == ScanState::Paused
            {
                inner = shared.worker_wait(inner);
                apply_request(&shared, &mut inner);
            }

            if inner.state == ScanState::Stopped {
                break;
            }

            std::mem::swap(&mut inner.pending_frame, &mut slots.processing);
            inner.pending = false;
        }

        slots.scaled.scaled_from(&slots.processing);
        let frame_id = slots.scaled.frame_id();
        let descriptor = slots.scaled.descriptor();
        let engine = &mut slots.engine;

        let failure = match panic::catch_unwind(AssertUnwindSafe(|| {
            engine.receive_frame(&descriptor)
        })) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
        };

        if let Some(reason) = failure {
            error!(frame_id, error = %reason, "Detection engine failed, stopping scanner");
            let mut inner = shared.lock();
            inner.state = ScanState::Stopped;
            inner.requested = None;
            shared.cond.notify_all();
            break;
        }
        trace!(frame_id, "Frame processed");
    }

    info!("Barcode worker exiting");
    slots
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        warn!("Panic payload is not a string");
        "unknown panic".to_string()
    }
}
