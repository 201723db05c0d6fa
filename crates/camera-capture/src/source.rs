//! Synthetic cabin camera
//!
//! Emits frames at a nominal rate with a deterministic timing wobble so the
//! downstream rate gate sees the same irregular cadence a physical sensor
//! produces.

use crate::{CameraConfig, CameraError, VideoFrame};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Jitter pattern in half-jitter units, repeated over the sequence number
const JITTER_PATTERN: [i64; 8] = [0, 2, -1, 1, -2, 0, 1, -1];

/// Frame producer standing in for the capture device
pub struct SyntheticCamera {
    config: CameraConfig,
    sequence: u32,
}

impl SyntheticCamera {
    /// Create a new synthetic camera
    pub fn new(config: CameraConfig) -> Result<Self, CameraError> {
        config.validate()?;
        info!(
            "Opening synthetic camera {}x{} @ {}fps (jitter ±{}ms)",
            config.width, config.height, config.fps, config.jitter_ms
        );
        Ok(Self {
            config,
            sequence: 0,
        })
    }

    /// Nominal period between frames
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.fps as f64)
    }

    /// Delay before emitting frame `sequence`
    pub fn delay_for(&self, sequence: u32) -> Duration {
        let period_ns = self.frame_period().as_nanos() as i64;
        let step_ns = (self.config.jitter_ms as i64 * 1_000_000) / 2;
        let offset = JITTER_PATTERN[sequence as usize % JITTER_PATTERN.len()] * step_ns;
        Duration::from_nanos((period_ns + offset).max(0) as u64)
    }

    /// Build the frame for the current sequence number
    fn capture(&mut self, timestamp_ns: u64) -> VideoFrame {
        let shade = ((self.sequence % 64) * 4) as u8;
        let frame = VideoFrame::solid(
            self.config.width,
            self.config.height,
            shade,
            timestamp_ns,
            self.sequence,
        );
        self.sequence = self.sequence.wrapping_add(1);
        frame
    }

    /// Deliver frames to `on_frame` until `shutdown` flips to true or its sender is dropped
    pub async fn run<F>(
        &mut self,
        mut on_frame: F,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), CameraError>
    where
        F: FnMut(VideoFrame),
    {
        let start = Instant::now();
        info!("Synthetic camera streaming");

        loop {
            let delay = self.delay_for(self.sequence);
            tokio::select! {
                _ = sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let timestamp_ns = start.elapsed().as_nanos() as u64;
            let frame = self.capture(timestamp_ns);
            debug!("Captured frame #{} at {}ns", frame.sequence, timestamp_ns);
            on_frame(frame);
        }

        info!("Synthetic camera stopped after {} frames", self.sequence);
        Ok(())
    }

    /// Number of frames produced so far
    pub fn frames_produced(&self) -> u32 {
        self.sequence
    }
}
