//! Recording Routes

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Response for recording control endpoints
#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub is_recording: bool,
    /// Whether the request changed the recording state
    pub changed: bool,
}

/// Start recording
pub async fn start(State(state): State<Arc<AppState>>) -> Json<RecordingResponse> {
    let changed = state.monitor.start_recording();
    Json(RecordingResponse {
        is_recording: state.monitor.status().is_recording,
        changed,
    })
}

/// Stop recording
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<RecordingResponse> {
    let was_recording = state.monitor.status().is_recording;
    state.monitor.stop_recording();
    Json(RecordingResponse {
        is_recording: false,
        changed: was_recording,
    })
}

/// Toggle recording
pub async fn toggle(State(state): State<Arc<AppState>>) -> Json<RecordingResponse> {
    let is_recording = state.monitor.toggle_recording();
    Json(RecordingResponse {
        is_recording,
        changed: true,
    })
}
