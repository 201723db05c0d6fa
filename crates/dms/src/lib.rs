//! Driver Monitoring System (DMS)
//!
//! Real-time drowsiness detection over a live cabin camera stream:
//! - Frame-rate gating and fixed-size batching
//! - Face and body-pose landmark detection per admitted frame
//! - Eye/head/pose tree-ensemble classification and fusion
//! - Escalating alarm on a drowsy verdict

pub mod analysis;
pub mod config;
pub mod detector;
pub mod monitor;
pub mod state;

pub use analysis::{BatchAnalysis, Verdict};
pub use config::DmsConfig;
pub use detector::{detect_batch, LandmarkEngine, MockLandmarkEngine};
pub use monitor::DrowsinessMonitor;
pub use state::MonitorStatus;

use feature_engine::FeatureError;
use inference_engine::InferenceError;
use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("No face detected")]
    NoFace,

    #[error("No body pose detected")]
    NoPose,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feature extraction failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
}
