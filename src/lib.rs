// SPDX-License-Identifier: MPL-2.0

//! Barcode Scanner - real-time barcode detection for live camera feeds
//!
//! This library takes frames from a camera delivery thread, keeps only the
//! newest one, downscales it and runs it through a detection engine on a
//! single worker thread. Codes are reported to one registered sink when they
//! are first seen and when they disappear.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Scan sessions and the frame processing pipeline
//! - [`backends`]: Camera frame types and pixel format conversion
//! - [`config`]: User configuration handling
//! - [`constants`]: Pipeline constants and barcode formats
//! - [`errors`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use barcode_scanner::{Config, ScanSession, sink_fn};
//!
//! let session = ScanSession::new(Config::default()).unwrap();
//! session.start_scanning(sink_fn(|event| println!("{:?}", event)));
//! // Camera delivery thread: session.submit_image(&image, orientation);
//! session.close();
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types
pub use app::ScanSession;
pub use app::frame_processor::{
    BarcodeEvent, DetectionEngine, EventSink, FrameScheduler, ScanState, sink_fn,
};
pub use config::Config;
pub use constants::BarcodeFormat;
