//! Service status handler.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use super::super::state::AppState;

/// Response from the status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Human-readable transport target
    pub printer: String,
    /// A job is being sent right now
    pub busy: bool,
    /// Jobs delivered since start
    pub jobs: u64,
}

/// GET /status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        printer: state.config.target.to_string(),
        busy: state.is_busy(),
        jobs: state.jobs_sent(),
    })
}
