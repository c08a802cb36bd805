// SPDX-License-Identifier: MPL-2.0

//! Frame processor module for async barcode detection
//!
//! This module takes camera frames off the delivery thread, keeps only the
//! newest one, downscales it and runs it through a detection engine on a
//! dedicated worker. Identity lifecycle reported by the engine is forwarded
//! to one registered sink on a fixed dispatch thread.

pub mod dispatcher;
pub mod frame_buffer;
pub mod scheduler;
pub mod tasks;
pub mod types;

pub use dispatcher::{
    EventDispatcher, EventSink, SharedSink, TrackEventSender, TrackerFactory, sink_fn,
};
pub use frame_buffer::{CaptureError, FrameBuffer};
pub use scheduler::FrameScheduler;
pub use tasks::{DetectionEngine, QrEngine};
pub use types::{BarcodeEvent, FrameDescriptor, ScanState, TrackEvent};
