//! Paginator — splits one tall capture across fixed-size A4 pages.
//!
//! The capture is scaled to the page width, so its physical height is
//! `capture_height * W / capture_width` millimetres. Page `i` shows the slice
//! starting at `i * H`.
//!
//! Two placement strategies:
//! - `Crop`: each page embeds its own page-aligned band of pixel rows. The
//!   bands are contiguous and cover every row exactly once.
//! - `Offset`: every page embeds the same full image shifted up by `i * H`
//!   and relies on the page media box to clip it.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::page::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::render::raster::RasterCapture;

/// Remaining heights at or below this (in mm) do not start a new page.
/// Absorbs float error when the image is an exact multiple of the page height.
const REMAINDER_EPSILON_MM: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceStrategy {
    #[default]
    Crop,
    Offset,
}

impl FromStr for SliceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crop" => Ok(SliceStrategy::Crop),
            "offset" => Ok(SliceStrategy::Offset),
            other => Err(format!(
                "unknown slice strategy '{other}' (expected crop or offset)"
            )),
        }
    }
}

/// Which pixels of the capture a placement draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageImage {
    /// The whole capture.
    Full,
    /// Rows `start..end` of the capture.
    Rows { start: u32, end: u32 },
}

/// One image placement on a page, in millimetres from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub image: PageImage,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub index: usize,
    pub placement: Placement,
}

/// Fixed-size pages over a single shared capture.
#[derive(Debug, Clone)]
pub struct PagedDocument {
    capture: Arc<RasterCapture>,
    strategy: SliceStrategy,
    pages: Vec<Page>,
}

impl PagedDocument {
    pub fn capture(&self) -> &RasterCapture {
        &self.capture
    }

    pub fn strategy(&self) -> SliceStrategy {
        self.strategy
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// Physical height of a capture scaled to the page width.
pub fn scaled_image_height_mm(width_px: u32, height_px: u32) -> f64 {
    if width_px == 0 {
        return 0.0;
    }
    height_px as f64 * PAGE_WIDTH_MM / width_px as f64
}

/// Capture rows that fit on one page at the page width.
pub fn rows_per_page(width_px: u32) -> f64 {
    PAGE_HEIGHT_MM * width_px as f64 / PAGE_WIDTH_MM
}

/// Number of pages needed for a capture. Always at least one.
///
/// Page 1 consumes the first H; every further page is added while the
/// remaining height is still positive.
pub fn page_count(width_px: u32, height_px: u32) -> usize {
    let image_height = scaled_image_height_mm(width_px, height_px);
    let mut remaining = image_height - PAGE_HEIGHT_MM;
    let mut pages = 1usize;
    while remaining > REMAINDER_EPSILON_MM {
        pages += 1;
        remaining -= PAGE_HEIGHT_MM;
    }
    pages
}

/// Page-aligned row bands for `pages` pages over a capture.
///
/// Band `i` starts at `floor(i * rows_per_page)`; the last band ends at the
/// final row. Bands are contiguous, non-empty, and never overlap.
pub fn row_ranges(width_px: u32, height_px: u32, pages: usize) -> Vec<(u32, u32)> {
    let per_page = rows_per_page(width_px);
    let boundary = |i: usize| ((i as f64 * per_page).floor() as u32).min(height_px);

    (0..pages)
        .map(|i| {
            let start = boundary(i);
            let end = if i + 1 == pages { height_px } else { boundary(i + 1) };
            (start, end)
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Pagination
// ────────────────────────────────────────────────────────────────────────────

/// Lays a capture out over A4 pages with the given strategy.
pub fn paginate(capture: Arc<RasterCapture>, strategy: SliceStrategy) -> PagedDocument {
    let (width, height) = (capture.width(), capture.height());
    let count = page_count(width, height);
    let image_height = scaled_image_height_mm(width, height);

    let pages: Vec<Page> = match strategy {
        SliceStrategy::Offset => (0..count)
            .map(|index| Page {
                index,
                placement: Placement {
                    image: PageImage::Full,
                    x_mm: 0.0,
                    y_mm: -(index as f64 * PAGE_HEIGHT_MM),
                    width_mm: PAGE_WIDTH_MM,
                    height_mm: image_height,
                },
            })
            .collect(),
        SliceStrategy::Crop => row_ranges(width, height, count)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Page {
                index,
                placement: Placement {
                    image: PageImage::Rows { start, end },
                    x_mm: 0.0,
                    y_mm: 0.0,
                    width_mm: PAGE_WIDTH_MM,
                    height_mm: scaled_image_height_mm(width, end - start),
                },
            })
            .collect(),
    };

    debug!(
        width,
        height,
        image_height_mm = image_height,
        pages = pages.len(),
        ?strategy,
        "Capture paginated"
    );

    PagedDocument {
        capture,
        strategy,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    // 210px wide → exactly 297 rows per page, so page maths is integral.
    const WIDTH: u32 = 210;
    const ROWS: u32 = 297;

    fn capture(width: u32, height: u32) -> Arc<RasterCapture> {
        Arc::new(RasterCapture::new(RgbImage::new(width, height), 2))
    }

    #[test]
    fn test_short_capture_is_one_page() {
        assert_eq!(page_count(WIDTH, 1), 1);
        assert_eq!(page_count(WIDTH, 100), 1);
        assert_eq!(page_count(1588, 192), 1);
    }

    #[test]
    fn test_exact_page_height_is_one_page() {
        assert_eq!(page_count(WIDTH, ROWS), 1);
        assert_eq!(page_count(WIDTH, 2 * ROWS), 2);
    }

    #[test]
    fn test_remainder_adds_exactly_one_page() {
        for k in 1..6u32 {
            for r in [1, 50, ROWS - 1] {
                assert_eq!(
                    page_count(WIDTH, k * ROWS + r),
                    (k + 1) as usize,
                    "k={k} r={r}"
                );
            }
        }
    }

    #[test]
    fn test_non_integral_rows_per_page() {
        // 1588px capture width → 2245.94 rows per page.
        assert_eq!(page_count(1588, 2245), 1);
        assert_eq!(page_count(1588, 2247), 2);
        assert_eq!(page_count(1588, 3 * 2245), 3);
        assert_eq!(page_count(1588, 3 * 2246), 4);
    }

    #[test]
    fn test_row_ranges_cover_every_row_once() {
        for height in [1, 296, 297, 298, 1000, 2 * ROWS, 2 * ROWS + 1] {
            let count = page_count(WIDTH, height);
            let ranges = row_ranges(WIDTH, height, count);
            assert_eq!(ranges.len(), count);
            assert_eq!(ranges[0].0, 0);
            assert_eq!(ranges.last().unwrap().1, height);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].1, pair[1].0, "gap or overlap at height {height}");
            }
            assert!(ranges.iter().all(|(s, e)| s < e), "empty band at height {height}");
        }
    }

    #[test]
    fn test_crop_placements_are_page_aligned() {
        let doc = paginate(capture(WIDTH, 2 * ROWS + 100), SliceStrategy::Crop);
        assert_eq!(doc.page_count(), 3);
        let pages = doc.pages();
        assert_eq!(pages[0].placement.image, PageImage::Rows { start: 0, end: 297 });
        assert_eq!(pages[1].placement.image, PageImage::Rows { start: 297, end: 594 });
        assert_eq!(pages[2].placement.image, PageImage::Rows { start: 594, end: 694 });
        assert!((pages[0].placement.height_mm - PAGE_HEIGHT_MM).abs() < 1e-9);
        assert!((pages[2].placement.height_mm - 100.0).abs() < 1e-9);
        assert!(pages.iter().all(|p| p.placement.y_mm == 0.0));
    }

    #[test]
    fn test_offset_placements_shift_by_page_height() {
        let doc = paginate(capture(WIDTH, 2 * ROWS + 100), SliceStrategy::Offset);
        assert_eq!(doc.page_count(), 3);
        for page in doc.pages() {
            assert_eq!(page.placement.image, PageImage::Full);
            assert!((page.placement.y_mm + page.index as f64 * PAGE_HEIGHT_MM).abs() < 1e-9);
            assert!((page.placement.height_mm - 694.0).abs() < 1e-9);
            assert_eq!(page.placement.width_mm, PAGE_WIDTH_MM);
        }
    }

    #[test]
    fn test_strategies_agree_on_page_count() {
        for height in [10, 297, 298, 5000] {
            let crop = paginate(capture(WIDTH, height), SliceStrategy::Crop);
            let offset = paginate(capture(WIDTH, height), SliceStrategy::Offset);
            assert_eq!(crop.page_count(), offset.page_count());
        }
    }

    #[test]
    fn test_slice_strategy_from_str() {
        assert_eq!("OFFSET".parse::<SliceStrategy>().unwrap(), SliceStrategy::Offset);
        assert_eq!("crop".parse::<SliceStrategy>().unwrap(), SliceStrategy::Crop);
        assert!("tile".parse::<SliceStrategy>().is_err());
    }
}
