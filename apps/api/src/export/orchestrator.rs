//! Export Orchestrator — capture → paginate → assemble, single-flight.
//!
//! # State machine
//! `Idle → Capturing → Assembling → (Done | Failed)`. No retries, no
//! cancellation. The current state is published on a `watch` channel.
//!
//! # Failure policy
//! Capture and assembly errors are logged and converted into
//! `ExportOutcome::Failed`; they never escape as `Err` and no partial file is
//! produced. Callers decide whether to surface the failure.
//!
//! # Re-entrancy
//! At most one export per rendered region is in flight. Regions are keyed by
//! content hash; a second call for a region that is still being exported
//! returns `ExportOutcome::Busy` without touching the state. Exports of
//! different regions run concurrently, and the published state follows the
//! most recent transition of any of them.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::export::assembler::{DocumentAssembler, PdfAssembler};
use crate::export::filename::export_file_name;
use crate::export::pagination::{paginate, SliceStrategy};
use crate::models::CvDocument;
use crate::render::raster::{CaptureError, GlyphRasterizer, RasterCapture, Rasterizer};
use crate::render::template::{render_template, RenderedRegion, Theme};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Device pixels per CSS px during capture.
    pub capture_scale: u32,
    /// Upper bound on a single capture; `None` waits forever.
    pub capture_timeout: Option<Duration>,
    pub slice_strategy: SliceStrategy,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            capture_scale: 2,
            capture_timeout: Some(Duration::from_secs(30)),
            slice_strategy: SliceStrategy::Crop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Idle,
    Capturing,
    Assembling,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Capture,
    Assembly,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStage::Capture => f.write_str("capture"),
            ExportStage::Assembly => f.write_str("assembly"),
        }
    }
}

/// A finished download.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

#[derive(Debug)]
pub enum ExportOutcome {
    Completed(ExportedFile),
    Failed { stage: ExportStage, reason: String },
    /// An export of the same region was already in flight.
    Busy,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct ExportOrchestrator {
    rasterizer: Arc<dyn Rasterizer>,
    assembler: Arc<dyn DocumentAssembler>,
    settings: ExportSettings,
    /// Content hashes of regions currently being exported.
    in_flight: Mutex<HashSet<u64>>,
    state: watch::Sender<ExportState>,
}

/// Releases a region's in-flight slot on every exit path.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<u64>>,
    key: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.key);
    }
}

fn region_key(region: &RenderedRegion) -> u64 {
    let mut hasher = DefaultHasher::new();
    region.hash(&mut hasher);
    hasher.finish()
}

impl ExportOrchestrator {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        assembler: Arc<dyn DocumentAssembler>,
        settings: ExportSettings,
    ) -> Self {
        let (state, _) = watch::channel(ExportState::Idle);
        Self {
            rasterizer,
            assembler,
            settings,
            in_flight: Mutex::new(HashSet::new()),
            state,
        }
    }

    /// Glyph rasterizer + lopdf assembler.
    pub fn with_defaults(settings: ExportSettings) -> Self {
        Self::new(Arc::new(GlyphRasterizer), Arc::new(PdfAssembler), settings)
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn state(&self) -> ExportState {
        *self.state.borrow()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<ExportState> {
        self.state.subscribe()
    }

    /// Renders and exports a document, naming the file after its owner.
    pub async fn export_document(&self, doc: &CvDocument, theme: Theme) -> ExportOutcome {
        let region = render_template(doc, theme);
        self.export_to_pdf(region, export_file_name(doc)).await
    }

    /// Captures `region`, paginates it onto A4 pages and assembles a PDF.
    pub async fn export_to_pdf(&self, region: RenderedRegion, file_name: String) -> ExportOutcome {
        let Some(_guard) = self.try_begin(region_key(&region)) else {
            warn!(file_name = %file_name, "Export of this document is already in flight");
            return ExportOutcome::Busy;
        };

        self.transition(ExportState::Capturing);
        let capture = match self.capture(Arc::new(region)).await {
            Ok(capture) => capture,
            Err(e) => return self.fail(ExportStage::Capture, e.to_string(), &file_name),
        };
        debug!(
            width = capture.width(),
            height = capture.height(),
            scale = capture.scale(),
            tiles = capture.tile_count(),
            "Region captured"
        );

        self.transition(ExportState::Assembling);
        let assembler = Arc::clone(&self.assembler);
        let strategy = self.settings.slice_strategy;
        let assembled = tokio::task::spawn_blocking(move || {
            let document = paginate(Arc::new(capture), strategy);
            let page_count = document.page_count();
            assembler
                .assemble(&document)
                .map(|bytes| (bytes, page_count))
        })
        .await;

        match assembled {
            Ok(Ok((bytes, page_count))) => {
                self.transition(ExportState::Done);
                info!(
                    file_name = %file_name,
                    pages = page_count,
                    bytes = bytes.len(),
                    "CV exported"
                );
                ExportOutcome::Completed(ExportedFile {
                    file_name,
                    bytes,
                    page_count,
                })
            }
            Ok(Err(e)) => self.fail(ExportStage::Assembly, e.to_string(), &file_name),
            Err(e) => self.fail(
                ExportStage::Assembly,
                format!("assembly worker failed: {e}"),
                &file_name,
            ),
        }
    }

    /// Captures a region at the configured scale, bounded by the capture timeout.
    ///
    /// On timeout the capture future is dropped, which signals the rasterizer's
    /// blocking worker to stop painting.
    ///
    /// Does not touch the export state; the preview endpoint uses it directly.
    pub async fn capture(&self, region: Arc<RenderedRegion>) -> Result<RasterCapture, CaptureError> {
        let scale = self.settings.capture_scale;
        let capture = self.rasterizer.rasterize(region, scale);
        match self.settings.capture_timeout {
            Some(limit) => tokio::time::timeout(limit, capture)
                .await
                .map_err(|_| CaptureError::Timeout(limit))?,
            None => capture.await,
        }
    }

    fn try_begin(&self, key: u64) -> Option<InFlightGuard<'_>> {
        let admitted = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key);
        admitted.then(|| InFlightGuard {
            in_flight: &self.in_flight,
            key,
        })
    }

    fn transition(&self, next: ExportState) {
        self.state.send_replace(next);
    }

    fn fail(&self, stage: ExportStage, reason: String, file_name: &str) -> ExportOutcome {
        error!(%stage, file_name, error = %reason, "CV export failed");
        self.transition(ExportState::Failed);
        ExportOutcome::Failed { stage, reason }
    }
}
