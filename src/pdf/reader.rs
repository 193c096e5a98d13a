//! PDFium-backed page access

use super::PagedDocument;
use crate::error::{Error, Result};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;

/// PDF user space is 72 units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Map PDFium errors to our error type
fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::InvalidPdf {
                reason: "document is password protected".to_string(),
            }
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError) => {
            Error::InvalidPdf {
                reason: "malformed document structure".to_string(),
            }
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

/// Render scale factor for a target resolution.
pub fn render_scale(dpi: u32) -> f32 {
    dpi as f32 / POINTS_PER_INCH
}

/// A loaded PDFium document
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: u32) -> Result<PdfPage<'a>> {
        self.document
            .pages()
            .get(index as u16)
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to get page {}: {}", index + 1, e),
            })
    }
}

impl PagedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> u32 {
        self.document.pages().len() as u32
    }

    fn native_text(&self, index: u32) -> Result<String> {
        let page = self.page(index)?;
        let text = match page.text() {
            Ok(text) => text.all(),
            Err(e) => {
                // A page whose text layer cannot be read is treated as having none
                tracing::debug!(page = index + 1, error = %e, "no readable text layer");
                String::new()
            }
        };
        Ok(text)
    }

    fn render(&self, index: u32, dpi: u32) -> Result<DynamicImage> {
        let page = self.page(index)?;
        let config = PdfRenderConfig::new()
            .scale_page_by_factor(render_scale(dpi))
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to render page {}: {}", index + 1, e),
            })?;

        Ok(bitmap.as_image())
    }
}

/// Open the PDF at `path` and hand it to `f`.
///
/// The PDFium binding and the document only live for the duration of the call.
pub fn with_document<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce(&dyn PagedDocument) -> Result<T>,
{
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path)?;
    with_document_bytes(&data, f)
}

/// Same as [`with_document`] for an in-memory PDF.
pub fn with_document_bytes<T, F>(data: &[u8], f: F) -> Result<T>
where
    F: FnOnce(&dyn PagedDocument) -> Result<T>,
{
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }

    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(map_pdfium_error)?;

    let document = PdfiumDocument { document };
    tracing::debug!(pages = document.page_count(), "PDF loaded");
    f(&document)
}
