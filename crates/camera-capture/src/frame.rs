//! Video frame types

use std::sync::Arc;
use std::time::Duration;

/// Decoded RGB video frame
///
/// Pixel data is reference counted so the preview path and the batch can
/// hold the same frame without copying it.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Arc<[u8]>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Monotonic capture timestamp (nanoseconds since the source started)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data: data.into(),
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a uniformly grey frame, mostly useful for tests and the synthetic source
    pub fn solid(width: u32, height: u32, shade: u8, timestamp_ns: u64, sequence: u32) -> Self {
        let len = (width as usize) * (height as usize) * 3;
        Self::new(vec![shade; len], width, height, timestamp_ns, sequence)
    }

    /// Capture timestamp as a duration
    pub fn timestamp(&self) -> Duration {
        Duration::from_nanos(self.timestamp_ns)
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Mean luminance in [0, 1]
    pub fn mean_luma(&self) -> f32 {
        let pixels = self.data.len() / 3;
        if pixels == 0 {
            return 0.0;
        }
        let sum: f32 = self
            .data
            .chunks_exact(3)
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            .map(|p| p[0] as f32 * 0.299 + p[1] as f32 * 0.587 + p[2] as f32 * 0.114)
            .sum();
        sum / pixels as f32 / 255.0
    }

    /// Borrow the frame as an `image` buffer for engines that expect one
    pub fn to_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.to_vec())
    }
}
