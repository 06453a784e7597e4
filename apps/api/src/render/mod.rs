//! Template rendering and raster capture.
//!
//! `template` turns a CV document into a visual tree; `raster` paints that tree
//! into a pixel buffer. Neither knows about pages.

pub mod raster;
pub mod template;
