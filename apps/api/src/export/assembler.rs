//! Document Assembler — writes a `PagedDocument` as PDF bytes.
//!
//! Each placement becomes an RGB image XObject (FlateDecode) drawn with a
//! single `cm`/`Do` pair. Under `SliceStrategy::Offset` the full capture is
//! embedded once and shared by every page; under `Crop` each page carries its
//! own band of rows.
//!
//! Output is deterministic: no timestamps, no document ID, objects written in
//! id order.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;
use tracing::debug;

use crate::export::pagination::{PageImage, PagedDocument, Placement};
use crate::layout::page::{mm_to_pt, page_size_pt};

const PDF_VERSION: &str = "1.4";
const IMAGE_RESOURCE: &str = "Im0";

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("document has no pages")]
    Empty,

    #[error("invalid image data: {0}")]
    InvalidImage(String),

    #[error("PDF write failed: {0}")]
    Write(String),
}

/// "Assemble raster images into a paged document" capability.
///
/// Synchronous; callers run it inside `spawn_blocking`.
pub trait DocumentAssembler: Send + Sync {
    fn assemble(&self, document: &PagedDocument) -> Result<Vec<u8>, AssemblyError>;
}

/// PDF assembler backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfAssembler;

impl DocumentAssembler for PdfAssembler {
    fn assemble(&self, document: &PagedDocument) -> Result<Vec<u8>, AssemblyError> {
        if document.pages().is_empty() {
            return Err(AssemblyError::Empty);
        }

        let capture = document.capture();
        let (page_width_pt, page_height_pt) = page_size_pt();

        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        let mut shared_full_image: Option<ObjectId> = None;
        let mut kids: Vec<Object> = Vec::with_capacity(document.page_count());

        for page in document.pages() {
            let placement = page.placement;
            let image_id = match placement.image {
                PageImage::Full => match shared_full_image {
                    Some(id) => id,
                    None => {
                        let stream = image_stream(
                            capture.width(),
                            capture.height(),
                            capture.pixel_chunks(),
                        )?;
                        let id = doc.add_object(stream);
                        shared_full_image = Some(id);
                        id
                    }
                },
                PageImage::Rows { start, end } => {
                    if start >= end || end > capture.height() {
                        return Err(AssemblyError::InvalidImage(format!(
                            "page {}: row band {start}..{end} outside capture height {}",
                            page.index + 1,
                            capture.height()
                        )));
                    }
                    let band = capture.rows(start, end);
                    doc.add_object(image_stream(
                        band.width(),
                        band.height(),
                        [band.as_raw().as_slice()],
                    )?)
                }
            };

            let content = placement_content(&placement, page_height_pt)?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::from(page_width_pt),
                    Object::from(page_height_pt),
                ],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! {
                        IMAGE_RESOURCE => image_id,
                    },
                },
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| AssemblyError::Write(e.to_string()))?;

        debug!(
            pages = page_count,
            bytes = bytes.len(),
            strategy = ?document.strategy(),
            "PDF assembled"
        );
        Ok(bytes)
    }
}

/// Builds an RGB8 image XObject with zlib-compressed samples.
///
/// `chunks` are consecutive runs of rows; a tiled capture streams its tiles
/// in without first joining them.
fn image_stream<'a>(
    width: u32,
    height: u32,
    chunks: impl IntoIterator<Item = &'a [u8]>,
) -> Result<Stream, AssemblyError> {
    if width == 0 || height == 0 {
        return Err(AssemblyError::InvalidImage(format!(
            "zero-sized image {width}x{height}"
        )));
    }
    let expected = width as usize * height as usize * 3;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let mut written = 0usize;
    for chunk in chunks {
        written += chunk.len();
        if written > expected {
            break;
        }
        encoder
            .write_all(chunk)
            .map_err(|e| AssemblyError::Write(e.to_string()))?;
    }
    if written != expected {
        return Err(AssemblyError::InvalidImage(format!(
            "expected {expected} bytes of RGB data, got {written}"
        )));
    }
    let compressed = encoder
        .finish()
        .map_err(|e| AssemblyError::Write(e.to_string()))?;

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        compressed,
    ))
}

/// Content stream drawing one image placement.
///
/// Placements are top-left based in mm; PDF user space is bottom-left based in
/// points, so the y origin is flipped against the page height.
fn placement_content(placement: &Placement, page_height_pt: f64) -> Result<Vec<u8>, AssemblyError> {
    let width = mm_to_pt(placement.width_mm);
    let height = mm_to_pt(placement.height_mm);
    let x = mm_to_pt(placement.x_mm);
    let y = page_height_pt - mm_to_pt(placement.y_mm) - height;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::from(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::from(height),
                    Object::from(x),
                    Object::from(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    content
        .encode()
        .map_err(|e| AssemblyError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use image::{Rgb, RgbImage};

    use crate::export::pagination::{paginate, SliceStrategy};
    use crate::render::raster::RasterCapture;

    fn striped_capture(width: u32, height: u32) -> Arc<RasterCapture> {
        let image = RgbImage::from_fn(width, height, |_, y| {
            if y % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        Arc::new(RasterCapture::new(image, 2))
    }

    fn image_objects(doc: &Document) -> usize {
        doc.objects
            .values()
            .filter(|obj| match obj {
                Object::Stream(stream) => stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|s| s.as_name())
                    .map(|name| name == b"Image")
                    .unwrap_or(false),
                _ => false,
            })
            .count()
    }

    #[test]
    fn test_single_page_pdf_loads() {
        let doc = paginate(striped_capture(210, 100), SliceStrategy::Crop);
        let bytes = PdfAssembler.assemble(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));

        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 1);
    }

    #[test]
    fn test_crop_embeds_one_image_per_page() {
        let doc = paginate(striped_capture(210, 700), SliceStrategy::Crop);
        let bytes = PdfAssembler.assemble(&doc).unwrap();
        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 3);
        assert_eq!(image_objects(&loaded), 3);
    }

    #[test]
    fn test_offset_shares_one_image() {
        let doc = paginate(striped_capture(210, 700), SliceStrategy::Offset);
        let bytes = PdfAssembler.assemble(&doc).unwrap();
        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 3);
        assert_eq!(image_objects(&loaded), 1);
    }

    #[test]
    fn test_every_page_is_a4() {
        let doc = paginate(striped_capture(210, 1000), SliceStrategy::Crop);
        let bytes = PdfAssembler.assemble(&doc).unwrap();
        let loaded = Document::load_mem(&bytes).unwrap();
        for (_, page_id) in loaded.get_pages() {
            let page = loaded.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            let height = media_box[3].as_float().unwrap();
            let width = media_box[2].as_float().unwrap();
            assert!((width - 595.28).abs() < 0.01);
            assert!((height - 841.89).abs() < 0.01);
        }
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let doc = paginate(striped_capture(210, 400), SliceStrategy::Crop);
        assert_eq!(
            PdfAssembler.assemble(&doc).unwrap(),
            PdfAssembler.assemble(&doc).unwrap()
        );
    }

    #[test]
    fn test_offset_content_places_image_above_page() {
        let placement = Placement {
            image: PageImage::Full,
            x_mm: 0.0,
            y_mm: -297.0,
            width_mm: 210.0,
            height_mm: 594.0,
        };
        let (_, page_height) = page_size_pt();
        let bytes = placement_content(&placement, page_height).unwrap();
        let content = Content::decode(&bytes).unwrap();
        let cm = &content.operations[1];
        assert_eq!(cm.operator, "cm");
        // Second half of a two-page image: bottom edge sits at y = 0.
        let y = cm.operands[5].as_float().unwrap();
        assert!(y.abs() < 0.01, "y was {y}");
    }

    #[test]
    fn test_mismatched_pixel_buffer_is_rejected() {
        let err = image_stream(2, 2, [&[0u8; 5][..]]).unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidImage(_)));
    }

    #[test]
    fn test_image_stream_joins_row_chunks() {
        let top = [0u8; 6];
        let bottom = [255u8; 6];
        let stream = image_stream(2, 2, [&top[..], &bottom[..]]).unwrap();
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 2);

        let err = image_stream(2, 3, [&top[..], &bottom[..]]).unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidImage(_)));
    }
}
