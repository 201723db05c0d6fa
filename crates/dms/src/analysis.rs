//! DMS batch analysis results

use inference_engine::FusionOutcome;
use serde::{Deserialize, Serialize};

/// Classification of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Driver showing signs of drowsiness
    Drowsy,
    /// Driver alert
    Alert,
    /// No classifier output (models or landmark engine unavailable).
    /// Never raises an alarm.
    Undetermined,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Drowsy => "drowsy",
            Verdict::Alert => "alert",
            Verdict::Undetermined => "undetermined",
        }
    }
}

/// Complete result of processing one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAnalysis {
    /// Recording epoch the batch was collected in
    pub epoch: u64,

    /// Frames in the batch
    pub frames: usize,

    /// Frames with no usable face landmarks
    pub missing_face: usize,

    /// Frames with no usable pose landmarks
    pub missing_pose: usize,

    pub verdict: Verdict,

    /// Channel and fused probabilities, when classification ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<FusionOutcome>,

    /// Why the verdict is undetermined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall time spent detecting and classifying
    pub latency_ms: u64,
}

impl BatchAnalysis {
    /// Analysis that could not produce a verdict
    pub fn undetermined(epoch: u64, frames: usize, error: impl Into<String>) -> Self {
        Self {
            epoch,
            frames,
            missing_face: 0,
            missing_pose: 0,
            verdict: Verdict::Undetermined,
            outcome: None,
            error: Some(error.into()),
            latency_ms: 0,
        }
    }

    pub fn is_drowsy(&self) -> bool {
        self.verdict == Verdict::Drowsy
    }
}
