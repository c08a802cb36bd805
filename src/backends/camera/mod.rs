// SPDX-License-Identifier: MPL-2.0

//! Camera frame types and conversions
//!
//! Device and session management live outside this crate. What remains here
//! is the contract with the frame producer: [`SourceImage`] describes one
//! delivered frame, [`FrameRotation`] normalizes the device orientation, and
//! [`format_converters`] builds camera-like frames from still images.

pub mod format_converters;
pub mod types;

pub use types::*;
