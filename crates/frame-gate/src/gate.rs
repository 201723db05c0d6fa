//! Admission state machine

use crate::GateConfig;
use camera_capture::VideoFrame;
use tracing::{debug, info, trace};

/// Why a frame was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Recording is stopped
    NotRecording,
    /// A batch is still being processed (backpressure)
    Processing,
    /// The drowsiness alarm is showing
    AlarmActive,
    /// Arrived before the target interval elapsed
    TooSoon,
}

/// A full batch handed off for processing
#[derive(Debug)]
pub struct Batch {
    /// Admitted frames in capture order
    pub frames: Vec<VideoFrame>,
    /// Recording epoch the batch was collected in
    pub epoch: u64,
}

/// Result of offering a frame to the gate
#[derive(Debug)]
pub enum GateOutcome {
    /// Frame ignored, gate state unchanged
    Dropped(DropReason),
    /// Frame appended to the current batch
    Admitted { batch_len: usize },
    /// Frame completed the batch; the caller now owns it and must call
    /// [`FrameGate::finish_processing`] when done
    BatchReady(Batch),
}

/// Frame buffer and rate gate
///
/// Not internally synchronized: all calls must be serialized by the owner.
#[derive(Debug)]
pub struct FrameGate {
    config: GateConfig,
    target_interval_ns: u64,
    recording: bool,
    processing: bool,
    last_admitted_ns: Option<u64>,
    batch: Vec<VideoFrame>,
    epoch: u64,
}

impl FrameGate {
    /// Create a stopped gate
    pub fn new(config: GateConfig) -> Self {
        let target_interval_ns = config.target_interval_ns();
        info!(
            "Creating frame gate: target={}fps (interval={}ns), batch_size={}",
            config.target_fps, target_interval_ns, config.batch_size
        );
        Self {
            target_interval_ns,
            recording: false,
            processing: false,
            last_admitted_ns: None,
            batch: Vec::with_capacity(config.batch_size),
            epoch: 0,
            config,
        }
    }

    /// Offer one incoming frame
    pub fn on_frame(&mut self, frame: VideoFrame, alarm_active: bool) -> GateOutcome {
        if !self.recording {
            return GateOutcome::Dropped(DropReason::NotRecording);
        }
        if self.processing {
            return GateOutcome::Dropped(DropReason::Processing);
        }
        if alarm_active {
            return GateOutcome::Dropped(DropReason::AlarmActive);
        }

        let due = match self.last_admitted_ns {
            None => true,
            Some(last) => frame.timestamp_ns.saturating_sub(last) >= self.target_interval_ns,
        };
        if !due {
            trace!("Frame #{} arrived too soon, dropping", frame.sequence);
            return GateOutcome::Dropped(DropReason::TooSoon);
        }

        self.last_admitted_ns = Some(frame.timestamp_ns);
        self.batch.push(frame);
        let batch_len = self.batch.len();
        debug!("{} frames collected so far", batch_len);

        if batch_len >= self.config.batch_size {
            self.processing = true;
            let frames = std::mem::replace(
                &mut self.batch,
                Vec::with_capacity(self.config.batch_size),
            );
            info!(
                "Batch of {} frames ready (epoch {})",
                frames.len(),
                self.epoch
            );
            return GateOutcome::BatchReady(Batch {
                frames,
                epoch: self.epoch,
            });
        }

        GateOutcome::Admitted { batch_len }
    }

    /// Begin collecting frames; returns false if already recording
    pub fn start_recording(&mut self) -> bool {
        if self.recording {
            return false;
        }
        self.epoch += 1;
        self.recording = true;
        self.batch.clear();
        self.last_admitted_ns = None;
        info!("Recording started (epoch {})", self.epoch);
        true
    }

    /// Stop collecting; any in-flight batch becomes stale
    pub fn stop_recording(&mut self) {
        if self.recording || self.processing {
            self.epoch += 1;
        }
        self.recording = false;
        self.processing = false;
        self.batch.clear();
        self.last_admitted_ns = None;
        info!("Recording stopped (epoch {})", self.epoch);
    }

    /// Flip between recording and stopped, returning the new recording state
    pub fn toggle_recording(&mut self) -> bool {
        if self.recording {
            self.stop_recording();
        } else {
            self.start_recording();
        }
        self.recording
    }

    /// Mark processing of the batch from `epoch` as complete.
    ///
    /// Returns true when the batch still belongs to the current recording,
    /// i.e. its verdict may be surfaced. A stale completion changes nothing.
    pub fn finish_processing(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            debug!(
                "Discarding completion from stale epoch {} (current {})",
                epoch, self.epoch
            );
            return false;
        }
        self.processing = false;
        self.recording
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Frames accumulated toward the current batch
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}
