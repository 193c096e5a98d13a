//! PDF access layer
//!
//! The pipeline only sees [`PagedDocument`]: a page count, the embedded text
//! of a page and a rasterization of a page. PDFium provides the production
//! implementation in [`reader`].

mod reader;

pub use reader::{render_scale, with_document, with_document_bytes, PdfiumDocument};

use crate::error::Result;
use image::DynamicImage;

/// A document made of numbered pages that can be read and rendered.
///
/// Indices are zero-based; page records are numbered from 1 by the pipeline.
pub trait PagedDocument {
    fn page_count(&self) -> u32;

    /// Embedded text layer of a page, empty when the page has none.
    fn native_text(&self, index: u32) -> Result<String>;

    /// Rasterize a page at the given resolution.
    fn render(&self, index: u32, dpi: u32) -> Result<DynamicImage>;
}
