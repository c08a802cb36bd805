// SPDX-License-Identifier: GPL-3.0-only

//! Detection engines
//!
//! The scheduler treats the decoder as a black box: it hands over one frame
//! at a time and the engine reports tracked identities on its own, through
//! the [`TrackEventSender`](super::dispatcher::TrackEventSender) it was built
//! with.

pub mod qr_detector;

pub use qr_detector::QrEngine;

use super::types::FrameDescriptor;
use crate::errors::EngineError;

/// A barcode detector fed by the frame scheduler
///
/// `receive_frame` runs on the scheduler's worker thread and may block for
/// as long as decoding takes. Returning an error (or panicking) halts the
/// scheduler.
pub trait DetectionEngine: Send + 'static {
    /// Process one downscaled frame
    fn receive_frame(&mut self, frame: &FrameDescriptor<'_>) -> Result<(), EngineError>;

    /// Free decoder resources and end all live tracks
    ///
    /// Called when the scheduler stops. The engine must accept frames again
    /// afterwards, since a stopped scheduler can be restarted.
    fn release(&mut self);
}

impl<E: DetectionEngine + ?Sized> DetectionEngine for Box<E> {
    fn receive_frame(&mut self, frame: &FrameDescriptor<'_>) -> Result<(), EngineError> {
        (**self).receive_frame(frame)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
