//! Alarm Routes

use alerting::AlarmSnapshot;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Response for the dismiss endpoint
#[derive(Debug, Serialize)]
pub struct DismissResponse {
    /// False when no alarm was active
    pub dismissed: bool,
    pub alarm: AlarmSnapshot,
}

/// Driver pressed "I'm alert now"
pub async fn dismiss(State(state): State<Arc<AppState>>) -> Json<DismissResponse> {
    let dismissed = state.monitor.dismiss_alarm();
    Json(DismissResponse {
        dismissed,
        alarm: state.monitor.alarm().snapshot(),
    })
}
