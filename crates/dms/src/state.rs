//! Pipeline state published to observers

use crate::analysis::Verdict;
use serde::{Deserialize, Serialize};

/// Recording and processing flags for UI reflection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub is_recording: bool,
    pub is_processing: bool,
    /// Batches whose processing finished, including discarded ones
    pub batches_completed: u64,
    /// Verdict of the most recent batch that was surfaced
    pub last_verdict: Option<Verdict>,
}
