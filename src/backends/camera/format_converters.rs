// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion into scanner input frames
//!
//! Still images (files, test fixtures) arrive as RGBA or grayscale and have
//! to look like a camera analysis stream before they can be submitted, so
//! this module produces planar YUV 4:2:0.

use super::types::YuvFrame;

/// BT.601 luma for one RGB pixel (studio swing is not applied)
fn luma(r: f32, g: f32, b: f32) -> u8 {
    (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8
}

/// Convert tightly packed RGBA to planar YUV 4:2:0 (I420)
///
/// Uses BT.601 coefficients. Chroma is the average of each 2x2 block;
/// blocks on the right/bottom edge of odd-sized images average the pixels
/// that exist.
pub fn rgba_to_yuv420(data: &[u8], width: u32, height: u32) -> YuvFrame {
    let w = width as usize;
    let h = height as usize;
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);

    let pixel = |x: usize, y: usize| -> [f32; 3] {
        let offset = (y * w + x) * 4;
        match data.get(offset..offset + 3) {
            Some(p) => [p[0] as f32, p[1] as f32, p[2] as f32],
            None => [0.0; 3],
        }
    };

    let mut y_plane = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let [r, g, b] = pixel(x, y);
            y_plane.push(luma(r, g, b));
        }
    }

    let mut u_plane = Vec::with_capacity(cw * ch);
    let mut v_plane = Vec::with_capacity(cw * ch);
    for cy in 0..ch {
        for cx in 0..cw {
            let mut sum = [0.0f32; 3];
            let mut count = 0.0f32;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (x, y) = (cx * 2 + dx, cy * 2 + dy);
                if x < w && y < h {
                    let p = pixel(x, y);
                    sum[0] += p[0];
                    sum[1] += p[1];
                    sum[2] += p[2];
                    count += 1.0;
                }
            }
            let (r, g, b) = (sum[0] / count, sum[1] / count, sum[2] / count);

            let u = -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
            let v = 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
            u_plane.push(u.round().clamp(0.0, 255.0) as u8);
            v_plane.push(v.round().clamp(0.0, 255.0) as u8);
        }
    }

    YuvFrame {
        width,
        height,
        y: y_plane,
        u: u_plane,
        v: v_plane,
    }
}

/// Wrap an 8-bit grayscale image as planar YUV 4:2:0 with neutral chroma
pub fn gray_to_yuv420(data: &[u8], width: u32, height: u32) -> YuvFrame {
    let w = width as usize;
    let h = height as usize;
    let chroma_len = w.div_ceil(2) * h.div_ceil(2);

    let mut y_plane = data[..(w * h).min(data.len())].to_vec();
    y_plane.resize(w * h, 0);

    YuvFrame {
        width,
        height,
        y: y_plane,
        u: vec![128; chroma_len],
        v: vec![128; chroma_len],
    }
}

/// Load an image file and convert it into a scanner input frame
///
/// Grayscale files keep their exact luma; everything else goes through
/// RGBA.
pub fn load_yuv420(path: &std::path::Path) -> Result<YuvFrame, image::ImageError> {
    let image = image::open(path)?;
    if let image::DynamicImage::ImageLuma8(gray) = &image {
        let (width, height) = gray.dimensions();
        return Ok(gray_to_yuv420(gray.as_raw(), width, height));
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(rgba_to_yuv420(rgba.as_raw(), width, height))
}
