//! Document printing, preview and calibration handlers.
//!
//! Options come from the query string as [`PrintOptions`] fields, e.g.
//! `POST /print?command_set=tspl&paper_width_mm=58&paper_height_mm=40`.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::super::state::AppState;
use super::{ApiError, api_error, task_error};
use crate::diagnostics;
use crate::error::{LabelprintError, Result};
use crate::pdf;
use crate::pipeline;
use crate::preview;
use crate::printer::PrintOptions;
use crate::transport::Transport;

/// Response from the print endpoints.
#[derive(Debug, Serialize)]
pub struct PrintResponse {
    pub success: bool,
    /// Identifier used for this job in the server log
    pub job_id: String,
    /// Size of the command stream sent
    pub bytes: usize,
    /// Pages in the job (0 for diagnostic labels)
    pub pages: usize,
}

fn require_pdf(body: &[u8]) -> Result<()> {
    if pdf::is_pdf(body) {
        Ok(())
    } else {
        Err(LabelprintError::InvalidInput(
            "request body is not a PDF document".into(),
        ))
    }
}

/// Send a finished command stream while holding the printer.
///
/// The write and the job count happen on the blocking pool together with the
/// printer guard, so they complete even if the client goes away.
async fn send(state: &Arc<AppState>, commands: Vec<u8>) -> std::result::Result<Uuid, ApiError> {
    let job_id = Uuid::new_v4();
    let printer = state.printer.clone().lock_owned().await;
    info!(job = %job_id, "Sending {} bytes", commands.len());
    let state = state.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let _printer = printer;
        state.config.target.open()?.write_all(&commands)?;
        let total = state.record_job();
        info!(job = %job_id, "Job sent to {} ({} total)", state.config.target, total);
        Ok(())
    })
    .await
    .map_err(task_error)?
    .map_err(api_error)?;

    Ok(job_id)
}

/// POST /print - Rasterize, encode and send a PDF.
pub async fn print(
    State(state): State<Arc<AppState>>,
    Query(options): Query<PrintOptions>,
    body: Bytes,
) -> std::result::Result<Json<PrintResponse>, ApiError> {
    require_pdf(&body).map_err(api_error)?;

    let source = state.source.clone();
    let job = tokio::task::spawn_blocking(move || {
        pipeline::build_job_from_bytes(source.as_ref(), &body, &options)
    })
    .await
    .map_err(task_error)?
    .map_err(api_error)?;

    let bytes = job.commands.len();
    let pages = job.pages.len();
    let job_id = send(&state, job.commands).await?;
    Ok(Json(PrintResponse {
        success: true,
        job_id: job_id.to_string(),
        bytes,
        pages,
    }))
}

/// POST /preview - PNG of the first rasterized page.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Query(options): Query<PrintOptions>,
    body: Bytes,
) -> std::result::Result<impl IntoResponse, ApiError> {
    require_pdf(&body).map_err(api_error)?;

    let source = state.source.clone();
    let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let images = source.render_bytes(&body)?;
        let first = images
            .first()
            .ok_or_else(|| LabelprintError::InvalidInput("document has no pages".into()))?;
        let width_dots = options.target_width_dots()?;
        let page = pipeline::rasterize_page(first, &options, width_dots)?;
        preview::render_png(&page)
    })
    .await
    .map_err(task_error)?
    .map_err(api_error)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// POST /calibrate - Send the TSPL calibration grid.
///
/// Uses the paper size, speed, density and margins from the options; the
/// paper height must be set.
pub async fn calibrate(
    State(state): State<Arc<AppState>>,
    Query(options): Query<PrintOptions>,
) -> std::result::Result<Json<PrintResponse>, ApiError> {
    let commands = diagnostics::calibration(&options.calibration_params()).map_err(api_error)?;
    let bytes = commands.len();
    let job_id = send(&state, commands).await?;
    Ok(Json(PrintResponse {
        success: true,
        job_id: job_id.to_string(),
        bytes,
        pages: 0,
    }))
}
