//! A4 page geometry shared by the template renderer and the paginator.
//!
//! Physical sizes are in millimetres (the document coordinate space), template
//! layout is in CSS pixels at 96 px/in, and the PDF writer works in points.

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;

const MM_PER_INCH: f64 = 25.4;
const PT_PER_INCH: f64 = 72.0;
const CSS_PX_PER_INCH: f64 = 96.0;

/// Millimetres to PDF points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_INCH / MM_PER_INCH
}

/// Millimetres to CSS pixels, rounded to the nearest pixel.
pub fn mm_to_css_px(mm: f64) -> u32 {
    (mm * CSS_PX_PER_INCH / MM_PER_INCH).round() as u32
}

/// Template width in CSS px: one A4 page width (794px).
pub fn template_width_px() -> u32 {
    mm_to_css_px(PAGE_WIDTH_MM)
}

/// Page size in PDF points, `(width, height)`.
pub fn page_size_pt() -> (f64, f64) {
    (mm_to_pt(PAGE_WIDTH_MM), mm_to_pt(PAGE_HEIGHT_MM))
}
