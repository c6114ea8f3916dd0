//! Frame type and pixel access
//!
//! Frames are RGB8, row-major, tagged with their capture time in seconds.
//! With the `image-processing` feature frames can be built from any image
//! the `image` crate decodes.

#[cfg(feature = "image-processing")]
use image::DynamicImage;

use crate::error::CaptureError;

/// One captured video frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw RGB8 pixel data (row-major)
    data: Vec<u8>,
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// Capture timestamp in seconds
    timestamp: f64,
}

impl Frame {
    /// Create a frame from raw RGB8 data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp: f64) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CaptureError::InvalidFrame(format!(
                "{}x{} RGB frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        if !timestamp.is_finite() {
            return Err(CaptureError::InvalidFrame(format!(
                "non-finite timestamp {}",
                timestamp
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp,
        })
    }

    /// Create a frame filled with a single colour
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], timestamp: f64) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
            timestamp,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get pixel at (x, y) as [R, G, B]
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Set pixel at (x, y)
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    /// Mean [R, G, B] over a rectangle, clipped to the frame
    ///
    /// Returns `None` when the clipped rectangle holds no pixel.
    pub fn region_mean_rgb(&self, x: u32, y: u32, w: u32, h: u32) -> Option<[f64; 3]> {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        if x >= x_end || y >= y_end {
            return None;
        }

        let mut sum = [0.0f64; 3];
        let stride = self.width as usize * 3;
        for row in y..y_end {
            let start = row as usize * stride + x as usize * 3;
            let end = row as usize * stride + x_end as usize * 3;
            for px in self.data[start..end].chunks_exact(3) {
                sum[0] += px[0] as f64;
                sum[1] += px[1] as f64;
                sum[2] += px[2] as f64;
            }
        }

        let count = ((x_end - x) as usize * (y_end - y) as usize) as f64;
        Some([sum[0] / count, sum[1] / count, sum[2] / count])
    }

    /// Convert to 8-bit luma (ITU-R BT.601 weights)
    pub fn to_grayscale(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .map(|px| (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32) as u8)
            .collect()
    }

    /// Build a frame from interleaved BGR8 data (OpenCV's native layout)
    pub fn from_bgr(bgr: &[u8], width: u32, height: u32, timestamp: f64) -> Result<Self, CaptureError> {
        let mut rgb = Vec::with_capacity(bgr.len());
        for px in bgr.chunks_exact(3) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        Self::new(rgb, width, height, timestamp)
    }
}

#[cfg(feature = "image-processing")]
impl Frame {
    /// Convert from an `image` crate DynamicImage
    pub fn from_dynamic_image(img: &DynamicImage, timestamp: f64) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self {
            data: rgb.into_raw(),
            width,
            height,
            timestamp,
        }
    }
}
