// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection engine
//!
//! This module implements a [`DetectionEngine`] on top of the rqrr crate.
//! Frames arrive already downscaled, so the luma plane is fed to the decoder
//! as is. Decoded codes are tracked across frames by their content: a code
//! gets an id the first time it is seen and is reported gone once it has
//! been missing for more than `max_gap_frames` consecutive frames.

use super::DetectionEngine;
use crate::app::frame_processor::dispatcher::TrackEventSender;
use crate::app::frame_processor::types::{FrameDescriptor, TrackEvent};
use crate::config::Config;
use crate::constants::{BarcodeFormat, DEFAULT_MAX_GAP_FRAMES};
use crate::errors::EngineError;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace, warn};

/// A code currently being tracked
#[derive(Debug)]
struct Track {
    id: i32,
    /// Consecutive frames without this code
    missing: u32,
}

/// QR code engine with content-keyed identity tracking
pub struct QrEngine {
    events: TrackEventSender,
    max_gap_frames: u32,
    tracks: HashMap<String, Track>,
    next_id: i32,
}

impl QrEngine {
    /// Create an engine reporting to `events` with the default gap tolerance
    pub fn new(events: TrackEventSender) -> Self {
        Self::with_max_gap_frames(events, DEFAULT_MAX_GAP_FRAMES)
    }

    /// Create an engine with a custom gap tolerance
    pub fn with_max_gap_frames(events: TrackEventSender, max_gap_frames: u32) -> Self {
        Self {
            events,
            max_gap_frames,
            tracks: HashMap::new(),
            next_id: 0,
        }
    }

    /// Create an engine from the scanner configuration
    ///
    /// Fails when the configuration does not ask for QR codes at all, since
    /// that is the only symbology this engine decodes.
    pub fn from_config(config: &Config, events: TrackEventSender) -> Result<Self, EngineError> {
        if !config.barcode_formats.contains(&BarcodeFormat::Qr) {
            return Err(EngineError::DecoderUnavailable(
                "QR engine selected but QR codes are not enabled".to_string(),
            ));
        }
        for format in config
            .barcode_formats
            .iter()
            .filter(|f| **f != BarcodeFormat::Qr)
        {
            warn!(%format, "Barcode format not supported by the QR engine, ignoring");
        }
        Ok(Self::with_max_gap_frames(events, config.max_gap_frames))
    }

    /// Number of codes currently tracked
    pub fn tracked_count(&self) -> usize {
        self.tracks.len()
    }

    /// Fold one frame's decoded contents into the tracking state
    fn update_tracks(&mut self, seen: HashSet<String>) -> Result<(), EngineError> {
        let mut gone = Vec::new();
        for (content, track) in self.tracks.iter_mut() {
            if seen.contains(content) {
                track.missing = 0;
            } else {
                track.missing += 1;
                if track.missing > self.max_gap_frames {
                    gone.push(content.clone());
                }
            }
        }

        for content in gone {
            if let Some(track) = self.tracks.remove(&content) {
                debug!(id = track.id, "QR code no longer tracked");
                self.emit(TrackEvent::Done { id: track.id })?;
            }
        }

        for content in seen {
            if self.tracks.contains_key(&content) {
                continue;
            }
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            debug!(id, content = %content, "New QR code tracked");
            self.tracks.insert(content.clone(), Track { id, missing: 0 });
            self.emit(TrackEvent::NewItem { id, value: content })?;
        }

        Ok(())
    }

    fn emit(&self, event: TrackEvent) -> Result<(), EngineError> {
        self.events
            .send(event)
            .map_err(|_| EngineError::Failed("track event receiver closed".to_string()))
    }
}

impl DetectionEngine for QrEngine {
    fn receive_frame(&mut self, frame: &FrameDescriptor<'_>) -> Result<(), EngineError> {
        let start = std::time::Instant::now();
        let width = frame.width as usize;
        let height = frame.height as usize;

        let luma = frame.luma();
        if luma.len() < width * height {
            return Err(EngineError::Failed(format!(
                "frame {} carries {} luma bytes for {}x{}",
                frame.frame_id,
                luma.len(),
                width,
                height
            )));
        }

        let mut seen = HashSet::new();
        if width > 0 && height > 0 {
            let mut prepared =
                rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
                    luma[y * width + x]
                });

            for grid in prepared.detect_grids() {
                match grid.decode() {
                    Ok((_meta, content)) => {
                        trace!(bounds = ?grid.bounds, "Decoded QR grid");
                        seen.insert(content);
                    }
                    Err(e) => {
                        debug!(error = ?e, "Failed to decode QR grid");
                    }
                }
            }
        }

        trace!(
            frame_id = frame.frame_id,
            rotation = %frame.rotation,
            codes = seen.len(),
            detection_ms = start.elapsed().as_millis(),
            "QR detection complete"
        );

        self.update_tracks(seen)
    }

    fn release(&mut self) {
        let mut live: Vec<i32> = self.tracks.drain().map(|(_, track)| track.id).collect();
        live.sort_unstable();
        debug!(count = live.len(), "Releasing QR engine");

        for id in live {
            if self.events.send(TrackEvent::Done { id }).is_err() {
                // Dispatcher already gone; nobody is left to tell
                break;
            }
        }
    }
}
