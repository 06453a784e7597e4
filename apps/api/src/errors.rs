use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::render::raster::CaptureError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "EXPORT_IN_PROGRESS", msg.clone()),
            AppError::ExportFailed(msg) => {
                // Already logged by the orchestrator.
                (StatusCode::UNPROCESSABLE_ENTITY, "EXPORT_FAILED", msg.clone())
            }
            AppError::Capture(e) => {
                tracing::error!("Capture error: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "CAPTURE_FAILED",
                    e.to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_409() {
        let response = AppError::Conflict("busy".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_export_failure_maps_to_422() {
        let response = AppError::ExportFailed("capture failed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_capture_error_converts() {
        let err: AppError = CaptureError::InvalidScale(0).into();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
