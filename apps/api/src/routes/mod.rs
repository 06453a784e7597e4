pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::export::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Export API
        .route("/api/v1/export", post(handlers::handle_export))
        .route(
            "/api/v1/export/status",
            get(handlers::handle_export_status),
        )
        .route("/api/v1/preview", post(handlers::handle_preview))
        .with_state(state)
}
