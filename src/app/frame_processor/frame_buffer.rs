// SPDX-License-Identifier: GPL-3.0-only

//! Reusable frame storage for the scanner pipeline
//!
//! A [`FrameBuffer`] is allocated once and refilled for every frame. The
//! backing storage only ever grows to the largest frame seen so far; the
//! logical length of the current frame is tracked separately so smaller
//! frames reuse the allocation.

use super::types::FrameDescriptor;
use crate::backends::camera::types::{FrameRotation, PixelFormat, SourceImage};
use crate::constants::DOWNSCALE_FACTOR;

/// Why a source frame could not be captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// Source is not planar YUV 4:2:0
    UnsupportedFormat(PixelFormat),
    /// Source is tagged planar YUV but does not carry three planes
    MissingPlanes(usize),
    /// Luma plane holds fewer than width*height bytes
    ShortLumaPlane { expected: usize, actual: usize },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::UnsupportedFormat(format) => {
                write!(f, "Unsupported pixel format: {}", format)
            }
            CaptureError::MissingPlanes(count) => {
                write!(f, "Expected 3 planes, got {}", count)
            }
            CaptureError::ShortLumaPlane { expected, actual } => {
                write!(f, "Luma plane too short: {} < {}", actual, expected)
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// One frame's pixel data plus metadata
#[derive(Debug, Default)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    frame_id: u32,
    rotation: FrameRotation,
    timestamp_ms: u64,
    /// Backing storage, sized to the high-water mark
    bytes: Vec<u8>,
    /// Bytes of `bytes` belonging to the current frame
    len: usize,
}

impl FrameBuffer {
    /// Create an empty buffer (no allocation until the first frame)
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a planar YUV 4:2:0 source into this buffer
    ///
    /// The luma plane is stored first, directly followed by the chroma-blue
    /// plane. On error nothing is modified, including the metadata.
    pub fn capture(&mut self, source: &SourceImage<'_>) -> Result<(), CaptureError> {
        if !source.format.is_planar_yuv420() {
            return Err(CaptureError::UnsupportedFormat(source.format));
        }
        if source.planes.len() != source.format.plane_count() {
            return Err(CaptureError::MissingPlanes(source.planes.len()));
        }
        let (Some(luma), Some(chroma_blue)) = (source.luma(), source.chroma_blue()) else {
            return Err(CaptureError::MissingPlanes(source.planes.len()));
        };

        let expected = source.width as usize * source.height as usize;
        if luma.len() < expected {
            return Err(CaptureError::ShortLumaPlane {
                expected,
                actual: luma.len(),
            });
        }

        let total = luma.len() + chroma_blue.len();
        self.ensure_capacity(total);
        self.bytes[..luma.len()].copy_from_slice(luma);
        self.bytes[luma.len()..total].copy_from_slice(chroma_blue);
        self.len = total;

        self.width = source.width;
        self.height = source.height;
        Ok(())
    }

    /// Fill this buffer with a [`DOWNSCALE_FACTOR`]-times smaller copy of `source`
    ///
    /// Nearest-neighbor: output pixel `(x, y)` is source luma pixel
    /// `(x * F, y * F)`. The buffer is sized for a full 4:2:0 frame but only
    /// the luma region is written; whatever the chroma tail held before is
    /// left in place. Frame id, rotation and timestamp are copied unchanged.
    pub fn scaled_from(&mut self, source: &FrameBuffer) {
        let factor = DOWNSCALE_FACTOR as usize;
        let src_width = source.width as usize;
        let width = src_width / factor;
        let height = source.height as usize / factor;

        self.width = width as u32;
        self.height = height as u32;
        self.len = width * height * 3 / 2;
        self.ensure_capacity(self.len);

        self.frame_id = source.frame_id;
        self.rotation = source.rotation;
        self.timestamp_ms = source.timestamp_ms;

        let src = source.data();
        for y in 0..height {
            let src_row = &src[y * factor * src_width..];
            let dst_row = &mut self.bytes[y * width..(y + 1) * width];
            for (x, dst) in dst_row.iter_mut().enumerate() {
                *dst = src_row[x * factor];
            }
        }
    }

    /// Stamp the metadata of the frame currently held
    pub fn set_metadata(&mut self, frame_id: u32, timestamp_ms: u64, rotation: FrameRotation) {
        self.frame_id = frame_id;
        self.timestamp_ms = timestamp_ms;
        self.rotation = rotation;
    }

    /// Describe the current contents for the detection engine
    pub fn descriptor(&self) -> FrameDescriptor<'_> {
        FrameDescriptor {
            data: self.data(),
            width: self.width,
            height: self.height,
            format: PixelFormat::NV21,
            frame_id: self.frame_id,
            timestamp_ms: self.timestamp_ms,
            rotation: self.rotation,
        }
    }

    /// Bytes of the current frame
    pub fn data(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Size of the backing storage (never decreases)
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    pub fn rotation(&self) -> FrameRotation {
        self.rotation
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    fn ensure_capacity(&mut self, needed: usize) {
        if self.bytes.len() < needed {
            self.bytes.resize(needed, 0);
        }
    }
}
