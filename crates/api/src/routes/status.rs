//! Status Routes

use alerting::AlarmSnapshot;
use axum::{extract::State, Json};
use dms::{BatchAnalysis, Verdict};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Pipeline and alarm state for UI reflection
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub is_recording: bool,
    pub is_processing: bool,
    pub pending_frames: usize,
    pub batches_completed: u64,
    pub last_verdict: Option<Verdict>,
    pub alarm: AlarmSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_analysis: Option<BatchAnalysis>,
}

/// Get current status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let monitor = &state.monitor;
    let status = monitor.status();
    Json(StatusResponse {
        is_recording: status.is_recording,
        is_processing: status.is_processing,
        pending_frames: monitor.pending_frames(),
        batches_completed: status.batches_completed,
        last_verdict: status.last_verdict,
        alarm: monitor.alarm().snapshot(),
        last_analysis: monitor.last_analysis(),
    })
}
