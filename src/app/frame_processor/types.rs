// SPDX-License-Identifier: MPL-2.0

//! Core types passed between the scheduler, the detection engine and the sink
//!
//! Frames flow down as [`FrameDescriptor`]s, identity lifecycle comes back up
//! as [`TrackEvent`]s, and the registered consumer finally sees
//! [`BarcodeEvent`]s.

use crate::backends::camera::types::{FrameRotation, PixelFormat};
use serde::{Deserialize, Serialize};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// No worker thread is running
    #[default]
    Stopped,
    /// Worker is processing frames as they arrive
    Running,
    /// Worker is alive but ignores submitted frames
    Paused,
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Stopped => write!(f, "stopped"),
            ScanState::Running => write!(f, "running"),
            ScanState::Paused => write!(f, "paused"),
        }
    }
}

/// One frame as handed to the detection engine
///
/// Borrows the scheduler's scaled buffer, so it is only valid for the
/// duration of [`DetectionEngine::receive_frame`](super::tasks::DetectionEngine::receive_frame).
#[derive(Debug, Clone, Copy)]
pub struct FrameDescriptor<'a> {
    /// Pixel bytes: luma plane followed by the chroma-sized tail
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Layout tag of `data`
    pub format: PixelFormat,
    /// Monotonic frame id assigned at submit time
    pub frame_id: u32,
    /// Capture time in milliseconds since the scheduler was created
    pub timestamp_ms: u64,
    pub rotation: FrameRotation,
}

impl FrameDescriptor<'_> {
    /// The luma plane only
    pub fn luma(&self) -> &[u8] {
        let len = (self.width as usize * self.height as usize).min(self.data.len());
        &self.data[..len]
    }
}

/// Lifecycle notification emitted by a detection engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    /// An identity was detected for the first time
    NewItem { id: i32, value: String },
    /// The identity is no longer tracked
    Done { id: i32 },
}

impl TrackEvent {
    /// Engine-assigned identity this event refers to
    pub fn id(&self) -> i32 {
        match self {
            TrackEvent::NewItem { id, .. } | TrackEvent::Done { id } => *id,
        }
    }
}

/// Event delivered to the registered sink
///
/// Serializes as `{"id": 5, "value": "ABC"}` while the code is tracked and
/// `{"id": 5, "value": null}` once it is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeEvent {
    pub id: i32,
    pub value: Option<String>,
}

impl BarcodeEvent {
    /// Event announcing a newly detected code
    pub fn detected(id: i32, value: impl Into<String>) -> Self {
        Self {
            id,
            value: Some(value.into()),
        }
    }

    /// Event announcing a code is no longer tracked
    pub fn lost(id: i32) -> Self {
        Self { id, value: None }
    }
}
