// SPDX-License-Identifier: GPL-3.0-only
// Shared types describing frames handed over by the camera layer

//! Shared types for camera frame delivery

use serde::{Deserialize, Serialize};

/// Pixel format tag for camera frames and frame descriptors
///
/// Only planar YUV 4:2:0 is accepted as scanner input. The other variants
/// exist so producers can describe what they actually have, and so the
/// scanner can reject it by tag instead of guessing from buffer sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// I420 - Planar 4:2:0 (separate Y, Cb, Cr planes)
    /// The flexible YUV layout most camera stacks deliver for analysis streams
    I420,
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved CbCr plane)
    NV12,
    /// NV21 - Semi-planar 4:2:0 (Y plane + interleaved CrCb plane)
    /// Tag used on descriptors handed to the detection engine
    NV21,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
}

impl PixelFormat {
    /// Check if this format is planar YUV 4:2:0 with separate chroma planes
    pub fn is_planar_yuv420(&self) -> bool {
        matches!(self, Self::I420)
    }

    /// Number of planes a frame in this format carries
    pub fn plane_count(&self) -> usize {
        match self {
            Self::I420 => 3,
            Self::NV12 | Self::NV21 => 2,
            Self::YUYV | Self::Gray8 | Self::RGBA => 1,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::I420 => "I420",
            Self::NV12 => "NV12",
            Self::NV21 => "NV21",
            Self::YUYV => "YUYV",
            Self::Gray8 => "GRAY8",
            Self::RGBA => "RGBA",
        };
        f.write_str(name)
    }
}

/// Frame rotation in degrees (clockwise)
///
/// Camera sensors are often mounted at an angle relative to the display, so
/// every frame carries the rotation the detection engine should assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameRotation {
    /// No rotation
    #[default]
    Deg0,
    /// 90 degrees clockwise
    Deg90,
    /// 180 degrees (upside down)
    Deg180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Deg270,
}

impl FrameRotation {
    /// Map a device orientation in degrees to a frame rotation.
    ///
    /// Only the four right angles are recognized. 360 and every other value
    /// (negative, off-axis, garbage) map to [`FrameRotation::Deg0`].
    pub fn from_orientation(degrees: i32) -> Self {
        match degrees {
            90 => FrameRotation::Deg90,
            180 => FrameRotation::Deg180,
            270 => FrameRotation::Deg270,
            _ => FrameRotation::Deg0,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            FrameRotation::Deg0 => 0,
            FrameRotation::Deg90 => 90,
            FrameRotation::Deg180 => 180,
            FrameRotation::Deg270 => 270,
        }
    }
}

impl std::fmt::Display for FrameRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// A frame as delivered by the camera, borrowed for the duration of a submit
///
/// Planes are tightly packed (row stride == plane width). For
/// [`PixelFormat::I420`] the plane order is `[Y, Cb, Cr]`.
#[derive(Debug, Clone, Copy)]
pub struct SourceImage<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: &'a [&'a [u8]],
}

impl<'a> SourceImage<'a> {
    /// Describe a planar YUV 4:2:0 image from its three planes
    pub fn i420(width: u32, height: u32, planes: &'a [&'a [u8]]) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::I420,
            planes,
        }
    }

    /// Luma plane, if this image has one
    pub fn luma(&self) -> Option<&'a [u8]> {
        match self.format {
            PixelFormat::I420 | PixelFormat::NV12 | PixelFormat::NV21 | PixelFormat::Gray8 => {
                self.planes.first().copied()
            }
            PixelFormat::YUYV | PixelFormat::RGBA => None,
        }
    }

    /// Chroma-blue (Cb / U) plane for planar YUV images
    pub fn chroma_blue(&self) -> Option<&'a [u8]> {
        if self.format.is_planar_yuv420() {
            self.planes.get(1).copied()
        } else {
            None
        }
    }
}

/// Owned planar YUV 4:2:0 frame, used where a frame has to outlive the
/// buffer it was decoded from (CLI feeds, test fixtures)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvFrame {
    pub width: u32,
    pub height: u32,
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
}

impl YuvFrame {
    /// Plane slices in `[Y, Cb, Cr]` order, ready for [`SourceImage::i420`]
    pub fn planes(&self) -> [&[u8]; 3] {
        [&self.y, &self.u, &self.v]
    }
}
