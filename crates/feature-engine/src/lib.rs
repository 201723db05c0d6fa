//! Feature Engineering Engine
//!
//! Turns per-frame face and body-pose landmarks into the three flattened,
//! fixed-length channel vectors (eye, head, pose) consumed by the
//! drowsiness classifiers.

mod features;
mod landmarks;

pub use features::{ChannelFeatures, FeatureExtractor};
pub use landmarks::{
    LandmarkLayout, LandmarkSet, Point3, FACE_LANDMARK_COUNT, MEDIAPIPE_EYE_INDICES,
    MEDIAPIPE_POSE_INDICES, POSE_LANDMARK_COUNT,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Values per landmark point (x, y, z)
pub const COORDS_PER_POINT: usize = 3;

/// One of the three independent feature/classifier pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Eye,
    Head,
    Pose,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Eye, Channel::Head, Channel::Pose];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Eye => "eye",
            Channel::Head => "head",
            Channel::Pose => "pose",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors during feature extraction
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Landmark index {index} out of range for {channel} (count {count})")]
    IndexOutOfRange {
        channel: Channel,
        index: usize,
        count: usize,
    },
    #[error("Duplicate landmark index {index} in {channel} set")]
    DuplicateIndex { channel: Channel, index: usize },
    #[error("Empty landmark index set for {0}")]
    EmptyChannel(Channel),
    #[error("Batch size mismatch: expected {expected}, got {actual}")]
    BatchSize { expected: usize, actual: usize },
}
