use std::sync::Arc;

use crate::config::Config;
use crate::export::ExportOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Shared by all requests; rejects overlapping exports of the same document.
    pub exporter: Arc<ExportOrchestrator>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let exporter = Arc::new(ExportOrchestrator::with_defaults(config.export_settings()));
        Self { config, exporter }
    }
}
