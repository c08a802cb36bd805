// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stride used when downscaling frames before detection (both axes)
pub const DOWNSCALE_FACTOR: u32 = 2;

/// Frames a tracked code may be missing before it is reported as gone
pub const DEFAULT_MAX_GAP_FRAMES: u32 = 3;

/// Delay between frames when the CLI replays still images (~30 fps)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// How long the CLI waits for trailing events after the last frame
pub const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Name of the scheduler worker thread
pub const WORKER_THREAD_NAME: &str = "barcode-worker";

/// Name of the thread that delivers events to the sink
pub const DISPATCH_THREAD_NAME: &str = "barcode-dispatch";

/// Directory under the user config dir holding scanner settings
pub const CONFIG_DIR_NAME: &str = "barcode-scanner";

/// Settings file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Barcode symbologies a scan session can ask for
///
/// Only [`BarcodeFormat::Qr`] is decodable by the built-in engine; the other
/// formats are accepted so a configuration can be shared with engines that
/// support them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    /// QR code (default)
    #[default]
    Qr,
    /// Data Matrix
    DataMatrix,
    /// Aztec
    Aztec,
    /// PDF417
    Pdf417,
    /// EAN-13 retail barcode
    Ean13,
    /// Code 128
    Code128,
}

impl BarcodeFormat {
    /// Get all formats for iteration
    pub const ALL: [BarcodeFormat; 6] = [
        BarcodeFormat::Qr,
        BarcodeFormat::DataMatrix,
        BarcodeFormat::Aztec,
        BarcodeFormat::Pdf417,
        BarcodeFormat::Ean13,
        BarcodeFormat::Code128,
    ];

    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            BarcodeFormat::Qr => "QR Code",
            BarcodeFormat::DataMatrix => "Data Matrix",
            BarcodeFormat::Aztec => "Aztec",
            BarcodeFormat::Pdf417 => "PDF417",
            BarcodeFormat::Ean13 => "EAN-13",
            BarcodeFormat::Code128 => "Code 128",
        }
    }
}

impl std::fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
