//! Axum route handlers for the Export API.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::export::filename::content_disposition;
use crate::export::orchestrator::{ExportOutcome, ExportState};
use crate::models::CvDocument;
use crate::render::template::{render_template, Theme};
use crate::state::AppState;

pub const PAGE_COUNT_HEADER: &str = "x-page-count";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RenderQuery {
    pub theme: Option<Theme>,
}

#[derive(Debug, Serialize)]
pub struct ExportStatusResponse {
    pub state: ExportState,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/export
///
/// Renders the posted CV, paginates it onto A4 pages and returns the PDF as a
/// download named `{lastName}_{firstName}_CV.pdf`.
pub async fn handle_export(
    State(state): State<AppState>,
    Query(query): Query<RenderQuery>,
    Json(doc): Json<CvDocument>,
) -> Result<Response, AppError> {
    let theme = query.theme.unwrap_or(state.config.default_theme);

    match state.exporter.export_document(&doc, theme).await {
        ExportOutcome::Completed(file) => {
            let disposition = HeaderValue::from_str(&content_disposition(&file.file_name))
                .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid file name header: {e}")))?;
            Ok((
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
                    (header::CONTENT_DISPOSITION, disposition),
                    (
                        header::HeaderName::from_static(PAGE_COUNT_HEADER),
                        HeaderValue::from(file.page_count),
                    ),
                ],
                file.bytes,
            )
                .into_response())
        }
        ExportOutcome::Busy => Err(AppError::Conflict(
            "An export of this document is already in progress".to_string(),
        )),
        ExportOutcome::Failed { stage, reason } => {
            Err(AppError::ExportFailed(format!("{stage} failed: {reason}")))
        }
    }
}

/// POST /api/v1/preview
///
/// Returns the captured template as a PNG, unpaginated. Backs the wizard's
/// live-preview step.
pub async fn handle_preview(
    State(state): State<AppState>,
    Query(query): Query<RenderQuery>,
    Json(doc): Json<CvDocument>,
) -> Result<Response, AppError> {
    let theme = query.theme.unwrap_or(state.config.default_theme);
    let region = Arc::new(render_template(&doc, theme));

    let capture = state.exporter.capture(region).await?;
    let png = tokio::task::spawn_blocking(move || capture.to_png())
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("preview encoder failed: {e}")))??;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("image/png"))],
        png,
    )
        .into_response())
}

/// GET /api/v1/export/status
pub async fn handle_export_status(State(state): State<AppState>) -> Json<ExportStatusResponse> {
    Json(ExportStatusResponse {
        state: state.exporter.state(),
    })
}
