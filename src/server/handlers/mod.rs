//! HTTP handlers for the server.

pub mod print;
pub mod status;

use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

use crate::error::LabelprintError;

/// Error body shared by all handlers: `{"success": false, "error": "..."}`.
pub type ApiError = (StatusCode, Json<Value>);

/// Map a library error to a response: caller mistakes are `400`, everything
/// else `500`.
pub fn api_error(e: LabelprintError) -> ApiError {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({"success": false, "error": e.to_string()})))
}

/// Error for a blocking task that panicked or was cancelled.
pub fn task_error(e: tokio::task::JoinError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"success": false, "error": format!("Task error: {}", e)})),
    )
}
