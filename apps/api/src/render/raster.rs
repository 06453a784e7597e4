//! Rasterizer — paints a `RenderedRegion` into RGB pixel tiles.
//!
//! Capture runs at an integer scale factor over the region's CSS px size
//! (2× by default) so the exported PDF stays sharp when zoomed.
//!
//! A capture is a vertical stack of full-width tiles, each at most
//! `MAX_CAPTURE_DIMENSION` rows tall, so a region of any height can be
//! captured without one oversized canvas.
//!
//! # spawn_blocking pattern
//! Painting is CPU-bound. `GlyphRasterizer` moves an `Arc` of the region into
//! `tokio::task::spawn_blocking` so the async executor is never blocked. The
//! worker polls a cancellation flag that is raised when the capture future is
//! dropped (e.g. by a timeout), so abandoned captures stop painting.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::layout::font_metrics::{glyph_columns, ADVANCE_DOTS, GLYPH_COLUMNS, GLYPH_ROWS};
use crate::render::template::{RenderedRegion, VisualNode};

/// Largest tile edge, in device pixels.
pub const MAX_CAPTURE_DIMENSION: u32 = 32_767;
pub const MAX_CAPTURE_SCALE: u32 = 4;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("region is not laid out ({width}x{height})")]
    NotLaidOut { width: u32, height: u32 },

    #[error("capture width of {0} px exceeds the maximum canvas size")]
    TooWide(u32),

    #[error("invalid capture scale {0}")]
    InvalidScale(u32),

    #[error("capture timed out after {0:?}")]
    Timeout(Duration),

    #[error("capture was cancelled")]
    Cancelled,

    #[error("capture worker failed: {0}")]
    Worker(String),

    #[error("image encoding failed: {0}")]
    Encode(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Capture snapshot
// ────────────────────────────────────────────────────────────────────────────

/// Immutable snapshot of a fully rendered region.
///
/// Tile `i` holds rows `i * tile_rows ..` of the capture; every tile but the
/// last is exactly `tile_rows` tall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterCapture {
    tiles: Vec<RgbImage>,
    tile_rows: u32,
    width: u32,
    height: u32,
    scale: u32,
}

impl RasterCapture {
    /// Wraps a single image as a one-tile capture.
    #[cfg(test)]
    pub fn new(image: RgbImage, scale: u32) -> Self {
        let (width, height) = image.dimensions();
        Self {
            tiles: vec![image],
            tile_rows: height.max(1),
            width,
            height,
            scale,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Raw RGB8 bytes of each tile, top to bottom. Concatenated they form the
    /// whole capture, row-major with no padding.
    pub fn pixel_chunks(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.tiles.iter().map(|tile| tile.as_raw().as_slice())
    }

    /// Colour of the device pixel at `(x, y)`, if inside the capture.
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let tile = self.tiles.get((y / self.tile_rows) as usize)?;
        tile.get_pixel_checked(x, y % self.tile_rows).copied()
    }

    /// Copies rows `start..end` into one image. The range may span tiles.
    pub fn rows(&self, start: u32, end: u32) -> RgbImage {
        let end = end.min(self.height);
        let start = start.min(end);
        let row_bytes = self.width as usize * 3;

        let mut raw = Vec::with_capacity(row_bytes * (end - start) as usize);
        let mut row = start;
        while row < end {
            let index = (row / self.tile_rows) as usize;
            let Some(tile) = self.tiles.get(index) else {
                break;
            };
            let local_start = row % self.tile_rows;
            let local_end = (end - index as u32 * self.tile_rows).min(tile.height());
            if local_end <= local_start {
                break;
            }
            raw.extend_from_slice(
                &tile.as_raw()[local_start as usize * row_bytes..local_end as usize * row_bytes],
            );
            row += local_end - local_start;
        }

        let rows = (raw.len() / row_bytes.max(1)) as u32;
        RgbImage::from_raw(self.width, rows, raw).unwrap_or_else(|| RgbImage::new(self.width, 0))
    }

    /// PNG encoding of the full capture (used by the preview endpoint).
    pub fn to_png(&self) -> Result<Vec<u8>, CaptureError> {
        let mut buf = Cursor::new(Vec::new());
        self.rows(0, self.height)
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rasterizer seam
// ────────────────────────────────────────────────────────────────────────────

/// "Render region to raster image" capability.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(
        &self,
        region: Arc<RenderedRegion>,
        scale: u32,
    ) -> Result<RasterCapture, CaptureError>;
}

/// Default rasterizer: paints the visual tree with the built-in glyph table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphRasterizer;

/// Raises the flag when the owning future is dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl Rasterizer for GlyphRasterizer {
    async fn rasterize(
        &self,
        region: Arc<RenderedRegion>,
        scale: u32,
    ) -> Result<RasterCapture, CaptureError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel = CancelOnDrop(Arc::clone(&cancelled));
        tokio::task::spawn_blocking(move || {
            paint_region(&region, scale, MAX_CAPTURE_DIMENSION, &cancelled)
        })
        .await
        .map_err(|e| CaptureError::Worker(e.to_string()))?
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Painting (synchronous)
// ────────────────────────────────────────────────────────────────────────────

/// Paints `region` at `scale` device pixels per CSS px.
#[cfg(test)]
pub fn rasterize_region(region: &RenderedRegion, scale: u32) -> Result<RasterCapture, CaptureError> {
    paint_region(region, scale, MAX_CAPTURE_DIMENSION, &AtomicBool::new(false))
}

/// Paints `region` in tiles of at most `tile_rows` rows, checking `cancelled`
/// between nodes.
fn paint_region(
    region: &RenderedRegion,
    scale: u32,
    tile_rows: u32,
    cancelled: &AtomicBool,
) -> Result<RasterCapture, CaptureError> {
    if !(1..=MAX_CAPTURE_SCALE).contains(&scale) {
        return Err(CaptureError::InvalidScale(scale));
    }
    if !region.is_laid_out() {
        return Err(CaptureError::NotLaidOut {
            width: region.width,
            height: region.height,
        });
    }

    let width = region.width.saturating_mul(scale);
    let height = region.height.saturating_mul(scale);
    if width > MAX_CAPTURE_DIMENSION {
        return Err(CaptureError::TooWide(width));
    }
    let tile_rows = tile_rows.clamp(1, MAX_CAPTURE_DIMENSION);

    let mut tiles = Vec::with_capacity(height.div_ceil(tile_rows) as usize);
    let mut top = 0;
    while top < height {
        let rows = tile_rows.min(height - top);
        let mut tile = Tile {
            canvas: RgbImage::from_pixel(width, rows, region.background),
            top,
        };
        for node in &region.nodes {
            if cancelled.load(Ordering::Relaxed) {
                return Err(CaptureError::Cancelled);
            }
            tile.paint(node, scale);
        }
        tiles.push(tile.canvas);
        top += rows;
    }

    debug!(
        width,
        height,
        tiles = tiles.len(),
        nodes = region.nodes.len(),
        "Region rasterized"
    );
    Ok(RasterCapture {
        tiles,
        tile_rows,
        width,
        height,
        scale,
    })
}

/// One horizontal band of the capture; `top` is its first row in capture
/// coordinates.
struct Tile {
    canvas: RgbImage,
    top: u32,
}

impl Tile {
    fn paint(&mut self, node: &VisualNode, scale: u32) {
        match node {
            VisualNode::Rule {
                x,
                y,
                width,
                height,
                color,
            } => self.fill_rect(
                x * scale,
                y * scale,
                width * scale,
                height * scale,
                *color,
            ),
            VisualNode::Text {
                x,
                y,
                dot,
                color,
                bold,
                text,
            } => {
                let glyph_height = GLYPH_ROWS * dot * scale;
                if self.overlaps(y * scale, glyph_height) {
                    self.paint_text(*x, *y, *dot, *color, *bold, text, scale);
                }
            }
        }
    }

    fn overlaps(&self, y: u32, height: u32) -> bool {
        y < self.top + self.canvas.height() && y.saturating_add(height) > self.top
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_text(
        &mut self,
        x: u32,
        y: u32,
        dot: u32,
        color: Rgb<u8>,
        bold: bool,
        text: &str,
        scale: u32,
    ) {
        let cell = dot * scale;
        // Bold widens every lit cell by half a cell to the right.
        let cell_width = if bold { cell + (cell / 2).max(1) } else { cell };

        for (i, c) in text.chars().enumerate() {
            let glyph_x = (x + i as u32 * ADVANCE_DOTS * dot) * scale;
            let columns = glyph_columns(c);
            for (col, bits) in columns.iter().enumerate().take(GLYPH_COLUMNS as usize) {
                for row in 0..GLYPH_ROWS {
                    if bits & (1 << row) != 0 {
                        self.fill_rect(
                            glyph_x + col as u32 * cell,
                            y * scale + row * cell,
                            cell_width,
                            cell,
                            color,
                        );
                    }
                }
            }
        }
    }

    /// Fills a rectangle given in capture coordinates, clipped to the tile.
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
        let bottom = self.top + self.canvas.height();
        let y_start = y.max(self.top);
        let y_end = y.saturating_add(height).min(bottom);
        let x_end = x.saturating_add(width).min(self.canvas.width());
        for py in y_start..y_end {
            for px in x.min(x_end)..x_end {
                self.canvas.put_pixel(px, py - self.top, color);
            }
        }
    }
}
