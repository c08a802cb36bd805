// SPDX-License-Identifier: MPL-2.0

//! Scan session management
//!
//! This module contains the frame processing pipeline and the session type
//! a camera layer drives it through.
//!
//! # Architecture
//!
//! - `frame_processor`: Frame scheduler, detection engines and event dispatch
//!
//! # Main Types
//!
//! - `ScanSession`: One scanner per open camera, started and paused with the preview

pub mod frame_processor;

use crate::backends::camera::types::{SourceImage, YuvFrame};
use crate::config::Config;
use crate::errors::{AppError, AppResult, EngineError};
use frame_processor::{
    DetectionEngine, EventDispatcher, FrameScheduler, QrEngine, ScanState, SharedSink,
    TrackEventSender, TrackerFactory,
};
use tracing::{debug, info};
use uuid::Uuid;

/// A barcode scanner bound to one camera session
///
/// Mirrors how a camera preview drives scanning: start it together with a
/// sink when the preview starts, pause and resume it with the preview, and
/// stop it when the camera switches back to a plain preview. Dropping the
/// session tears the scanner down.
pub struct ScanSession {
    id: Uuid,
    config: Config,
    scheduler: FrameScheduler,
}

impl ScanSession {
    /// Create a session using the built-in QR engine
    pub fn new(config: Config) -> AppResult<Self> {
        Self::with_engine(config.clone(), |events| {
            QrEngine::from_config(&config, events)
        })
    }

    /// Create a session around a custom detection engine
    ///
    /// `build` receives the sender the engine must report identities through.
    pub fn with_engine<E, F>(config: Config, build: F) -> AppResult<Self>
    where
        E: DetectionEngine,
        F: FnOnce(TrackEventSender) -> Result<E, EngineError>,
    {
        config.validate()?;

        let (dispatcher, events) = EventDispatcher::spawn(TrackerFactory::new())
            .map_err(|e| AppError::Other(format!("Failed to start dispatch thread: {}", e)))?;
        let engine = build(events)?;

        let id = Uuid::new_v4();
        info!(session = %id, "Scan session created");
        Ok(Self {
            id,
            config,
            scheduler: FrameScheduler::new(engine, dispatcher),
        })
    }

    /// Session identifier used in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current scanner state
    pub fn state(&self) -> ScanState {
        self.scheduler.state()
    }

    /// Start scanning and report detections to `sink`
    ///
    /// A scan already in progress is stopped first, so codes it was
    /// tracking are reported gone to the sink they were bound to.
    pub fn start_scanning(&self, sink: SharedSink) {
        debug!(session = %self.id, "Starting barcode scanning");
        self.scheduler.stop();
        self.scheduler.set_sink(sink);
        self.scheduler.start();
    }

    /// Pause scanning while the preview is paused
    pub fn pause_scanning(&self) {
        debug!(session = %self.id, "Pausing barcode scanning");
        self.scheduler.pause();
    }

    /// Resume scanning after [`ScanSession::pause_scanning`]
    pub fn resume_scanning(&self) {
        debug!(session = %self.id, "Resuming barcode scanning");
        self.scheduler.resume();
    }

    /// Stop scanning, keeping the session for a later restart
    pub fn stop_scanning(&self) {
        debug!(session = %self.id, "Stopping barcode scanning");
        self.scheduler.stop();
    }

    /// Hand a camera frame to the scanner
    pub fn submit_image(&self, image: &SourceImage<'_>, orientation_degrees: i32) -> bool {
        self.scheduler.submit_image(image, orientation_degrees)
    }

    /// Hand an owned YUV frame to the scanner, using the configured orientation
    pub fn submit_frame(&self, frame: &YuvFrame) -> bool {
        let planes = frame.planes();
        let image = SourceImage::i420(frame.width, frame.height, &planes);
        self.submit_image(&image, self.config.default_orientation)
    }

    /// Tear the session down, waiting for pending events to be delivered
    pub fn close(self) {
        info!(session = %self.id, "Closing scan session");
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::FrameRotation;
    use crate::constants::BarcodeFormat;
    use frame_processor::FrameDescriptor;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Engine forwarding the rotation of each frame it sees
    struct RotationEngine(mpsc::Sender<FrameRotation>);

    impl DetectionEngine for RotationEngine {
        fn receive_frame(&mut self, frame: &FrameDescriptor<'_>) -> Result<(), EngineError> {
            let _ = self.0.send(frame.rotation);
            Ok(())
        }

        fn release(&mut self) {}
    }

    #[test]
    fn test_new_session_is_stopped() {
        let session = ScanSession::new(Config::default()).unwrap();
        assert_eq!(session.state(), ScanState::Stopped);
        session.close();
    }

    #[test]
    fn test_submit_frame_uses_configured_orientation() {
        let (tx, rx) = mpsc::channel();
        let config = Config {
            default_orientation: 180,
            ..Config::default()
        };
        let session = ScanSession::with_engine(config, |_events| Ok(RotationEngine(tx))).unwrap();
        session.start_scanning(frame_processor::sink_fn(|_| {}));

        let frame = YuvFrame {
            width: 4,
            height: 4,
            y: vec![0; 16],
            u: vec![128; 4],
            v: vec![128; 4],
        };
        assert!(session.submit_frame(&frame));
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Ok(FrameRotation::Deg180)
        );
        session.close();
    }

    #[test]
    fn test_session_rejects_invalid_config() {
        let config = Config {
            barcode_formats: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(
            ScanSession::new(config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_session_rejects_config_without_qr() {
        let config = Config {
            barcode_formats: vec![BarcodeFormat::Code128],
            ..Config::default()
        };
        assert!(matches!(
            ScanSession::new(config),
            Err(AppError::Engine(EngineError::DecoderUnavailable(_)))
        ));
    }
}
