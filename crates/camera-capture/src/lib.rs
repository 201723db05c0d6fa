//! Camera Capture Library for Driver Drowsiness Monitoring
//!
//! Provides the frame handle consumed by the capture-to-decision pipeline
//! and a synthetic cabin camera that delivers frames at an irregular,
//! sensor-like cadence.

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::SyntheticCamera;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Invalid format: {0}")]
    Format(String),
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Nominal sensor FPS
    pub fps: u32,
    /// Maximum deviation from the nominal frame period (milliseconds)
    pub jitter_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 30,
            jitter_ms: 6,
        }
    }
}

impl CameraConfig {
    /// Front-facing cabin camera (portrait 720p @ 30fps)
    pub fn cabin() -> Self {
        Self {
            width: 720,
            height: 1280,
            fps: 30,
            jitter_ms: 8,
        }
    }

    /// Validate the configuration before opening a source
    pub fn validate(&self) -> Result<(), CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::Format(format!(
                "invalid resolution {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(CameraError::Format("fps must be positive".into()));
        }
        let period_ms = 1000 / self.fps as u64;
        if self.jitter_ms >= period_ms {
            return Err(CameraError::Format(format!(
                "jitter {}ms must be below the frame period {}ms",
                self.jitter_ms, period_ms
            )));
        }
        Ok(())
    }
}
