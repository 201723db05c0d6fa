//! Frame Rate Gate
//!
//! Subsamples an irregular camera stream to a fixed target rate and
//! accumulates admitted frames into fixed-size batches for the
//! landmark/classification pipeline.

mod gate;

pub use gate::{Batch, DropReason, FrameGate, GateOutcome};

use serde::{Deserialize, Serialize};

/// Default admission rate (frames per second)
pub const DEFAULT_TARGET_FPS: f64 = 24.0;

/// Default number of admitted frames per batch (10s of video at 24fps)
pub const DEFAULT_BATCH_SIZE: usize = 240;

/// Gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Target admission rate in Hz
    pub target_fps: f64,
    /// Frames per batch handed to processing
    pub batch_size: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl GateConfig {
    /// Minimum gap between admitted frames in nanoseconds
    pub fn target_interval_ns(&self) -> u64 {
        (1e9 / self.target_fps).round() as u64
    }
}
