// SPDX-License-Identifier: MPL-2.0

//! Camera-facing input layer
//!
//! The scanner does not open devices itself. Frames are handed over by
//! whatever owns the camera session, so this layer only describes what such
//! a frame looks like and how to turn other image sources into one.
//!
//! ```text
//! ┌──────────────────────┐
//! │ Camera / file source │
//! └──────────┬───────────┘
//!            │ SourceImage (I420)
//!            ▼
//! ┌──────────────────────┐
//! │    FrameScheduler    │
//! └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Frame types and pixel format conversion

pub mod camera;
