//! Extraction pipeline
//!
//! [`Extractor`] ties the pieces together: the input is dispatched on its
//! [`Format`], every page goes through the [`Arbiter`] and the
//! [`PageAggregator`] numbers and normalizes the results.

mod aggregate;
mod arbiter;
mod format;

pub use aggregate::{Candidate, PageAggregator, PageRecord, Source};
pub use arbiter::Arbiter;
pub use format::Format;

use crate::config::ExtractionConfig;
use crate::docx::DocxPackage;
use crate::error::{Error, ErrorKind, Result};
use crate::ocr::EngineContext;
use crate::pdf::{self, PagedDocument};
use crate::quality::QualityEvaluator;
use image::{DynamicImage, Rgb, RgbImage};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Pages extracted from one input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub path: PathBuf,
    pub format: Format,
    pub pages: Vec<PageRecord>,
}

/// Reusable, thread-safe extraction entry point.
///
/// OCR engines are created on first use and shared by every later call, so
/// one extractor should serve the whole process.
#[derive(Debug, Clone)]
pub struct Extractor {
    config: Arc<ExtractionConfig>,
    quality: QualityEvaluator,
    engines: Arc<EngineContext>,
}

impl Extractor {
    /// Validate `config`, load the dictionary and prepare (but do not start) the engines.
    ///
    /// Engines this build cannot construct are rejected here rather than on
    /// the first page that needs them.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        if let Some(kind) = config.ocr.engines.iter().find(|kind| !kind.is_available()) {
            return Err(Error::Config {
                reason: format!("OCR engine {} requires the `neural` feature", kind),
            });
        }
        let engines = EngineContext::new(config.ocr.clone());
        Self::with_engines(config, engines)
    }

    /// Same as [`Extractor::new`] with a caller-provided engine context.
    pub fn with_engines(config: ExtractionConfig, engines: EngineContext) -> Result<Self> {
        config.validate()?;
        let quality = QualityEvaluator::from_config(&config.quality)?;
        Ok(Self {
            config: Arc::new(config),
            quality,
            engines: Arc::new(engines),
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn engines(&self) -> &EngineContext {
        &self.engines
    }

    pub fn quality(&self) -> &QualityEvaluator {
        &self.quality
    }

    fn arbiter(&self) -> Arbiter<'_> {
        Arbiter::new(
            &self.quality,
            &self.engines,
            self.config.ocr.strategy,
            &self.config.ocr.engines,
        )
    }

    /// Extract the ordered page records of a file.
    pub fn extract(&self, path: &Path) -> Result<Vec<PageRecord>> {
        Ok(self.extract_document(path)?.pages)
    }

    /// Extract a file and keep its path and format alongside the pages.
    pub fn extract_document(&self, path: &Path) -> Result<Document> {
        let format = Format::from_path(path)?;
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        tracing::info!(path = %path.display(), %format, "extracting document");
        let pages = match format {
            Format::Pdf => pdf::with_document(path, |doc| self.extract_paged(doc))?,
            Format::Docx => self.extract_docx(path)?,
            Format::Image => self.extract_images(std::slice::from_ref(&path.to_path_buf()))?,
        };

        let ocr_pages = pages.iter().filter(|p| p.source.is_ocr()).count();
        tracing::info!(
            path = %path.display(),
            pages = pages.len(),
            ocr_pages,
            "extraction finished"
        );

        Ok(Document {
            path: path.to_path_buf(),
            format,
            pages,
        })
    }

    /// Recovery policy for callers that must always produce a page list:
    /// extraction failures are logged and become an empty list. Unsupported
    /// formats and engine initialization failures are still returned.
    pub fn extract_or_empty(&self, path: &Path) -> Result<Vec<PageRecord>> {
        match self.extract(path) {
            Ok(pages) => Ok(pages),
            Err(e) if e.kind() == ErrorKind::Extraction => {
                tracing::warn!(path = %path.display(), error = %e, "extraction failed, returning no pages");
                Ok(vec![])
            }
            Err(e) => Err(e),
        }
    }

    /// Treat several image files as the pages of one document, in path order.
    pub fn extract_image_set(&self, paths: &[PathBuf]) -> Result<Vec<PageRecord>> {
        for path in paths {
            let format = Format::from_path(path)?;
            if format != Format::Image {
                return Err(Error::UnsupportedFormat {
                    extension: format!(".{}", format.as_str()),
                });
            }
        }

        let mut sorted = paths.to_vec();
        sorted.sort();
        tracing::info!(images = sorted.len(), "extracting image set");
        self.extract_images(&sorted)
    }

    /// Run the per-page pipeline over any paged document.
    pub fn extract_paged(&self, document: &dyn PagedDocument) -> Result<Vec<PageRecord>> {
        let arbiter = self.arbiter();
        let dpi = self.config.render.dpi;
        let mut pages = PageAggregator::with_capacity(document.page_count() as usize);

        for index in 0..document.page_count() {
            let page_number = pages.next_page_number();
            let native = document.native_text(index)?;
            let candidate = arbiter.arbitrate(page_number, Some(&native), || {
                tracing::debug!(page = page_number, dpi, "rendering page for OCR");
                document.render(index, dpi)
            })?;
            pages.push(candidate);
        }

        Ok(pages.finish())
    }

    fn extract_docx(&self, path: &Path) -> Result<Vec<PageRecord>> {
        let package = DocxPackage::open(path)?;
        let arbiter = self.arbiter();
        let mut pages = PageAggregator::with_capacity(1 + package.images.len());

        let text = package.text();
        let candidate = arbiter.arbitrate(pages.next_page_number(), Some(&text), || {
            Ok(self.blank_canvas())
        })?;
        pages.push(candidate);

        for embedded in &package.images {
            let page_number = pages.next_page_number();
            tracing::debug!(page = page_number, part = %embedded.name, "recognizing embedded image");
            let image = image::load_from_memory(&embedded.bytes)?;
            pages.push(arbiter.recognize(page_number, &image)?);
        }

        Ok(pages.finish())
    }

    fn extract_images(&self, paths: &[PathBuf]) -> Result<Vec<PageRecord>> {
        let arbiter = self.arbiter();
        let mut pages = PageAggregator::with_capacity(paths.len());

        for path in paths {
            if !path.exists() {
                return Err(Error::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            let image = image::open(path)?;
            pages.push(arbiter.recognize(pages.next_page_number(), &image)?);
        }

        Ok(pages.finish())
    }

    /// White canvas OCR'd when the DOCX body text is rejected.
    fn blank_canvas(&self) -> DynamicImage {
        let render = &self.config.render;
        DynamicImage::ImageRgb8(RgbImage::from_pixel(
            render.blank_width,
            render.blank_height,
            Rgb([255, 255, 255]),
        ))
    }
}

static DEFAULT_EXTRACTOR: OnceCell<Extractor> = OnceCell::new();

/// Extract a file with the default configuration and a process-wide extractor.
pub fn extract(path: &Path) -> Result<Vec<PageRecord>> {
    let extractor = DEFAULT_EXTRACTOR.get_or_try_init(|| Extractor::new(ExtractionConfig::default()))?;
    extractor.extract(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{EngineKind, OcrEngine, OcrResult};
    use pretty_assertions::assert_eq;

    struct Echo(EngineKind, &'static str, Option<f32>);

    impl OcrEngine for Echo {
        fn kind(&self) -> EngineKind {
            self.0
        }

        fn recognize(&mut self, _image: &DynamicImage) -> Result<OcrResult> {
            Ok(OcrResult::new(self.1, self.2))
        }
    }

    /// Pages with fixed native text and a plain rendering
    struct FakePages(Vec<&'static str>);

    impl PagedDocument for FakePages {
        fn page_count(&self) -> u32 {
            self.0.len() as u32
        }

        fn native_text(&self, index: u32) -> Result<String> {
            Ok(self.0[index as usize].to_string())
        }

        fn render(&self, _index: u32, _dpi: u32) -> Result<DynamicImage> {
            Ok(DynamicImage::new_rgb8(10, 10))
        }
    }

    fn extractor() -> Extractor {
        let mut config = ExtractionConfig::default();
        config.ocr.engines = vec![EngineKind::Tesseract, EngineKind::Trocr];
        let engines = EngineContext::with_factory(config.ocr.clone(), |kind, _| {
            Err(Error::engine_init(kind, "not installed"))
        })
        .with_engine(Box::new(Echo(EngineKind::Tesseract, "xx", Some(10.0))))
        .with_engine(Box::new(Echo(EngineKind::Trocr, "scribbled  note", None)));
        Extractor::with_engines(config, engines).unwrap()
    }

    #[test]
    fn test_paged_document_mixes_native_and_ocr() {
        let doc = FakePages(vec![
            "The report about the water supply for the city.",
            "",
            "The house and the garden near the river.",
        ]);
        let pages = extractor().extract_paged(&doc).unwrap();

        let summary: Vec<(u32, Source)> = pages.iter().map(|p| (p.page_number, p.source)).collect();
        assert_eq!(
            summary,
            vec![(1, Source::Native), (2, Source::Trocr), (3, Source::Native)]
        );
        assert_eq!(pages[1].text, "scribbled note");
    }

    #[test]
    fn test_unsupported_format_before_file_access() {
        let err = extractor().extract(Path::new("/nonexistent/file.xyz")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == ".xyz"));
    }

    #[test]
    fn test_missing_file_after_dispatch() {
        let err = extractor().extract(Path::new("/nonexistent/scan.png")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_extract_or_empty_policy() {
        let ex = extractor();
        assert!(ex.extract_or_empty(Path::new("/nonexistent/scan.png")).unwrap().is_empty());
        assert!(ex.extract_or_empty(Path::new("notes.xyz")).is_err());
    }

    #[test]
    fn test_image_set_rejects_non_images() {
        let err = extractor()
            .extract_image_set(&[PathBuf::from("a.png"), PathBuf::from("b.pdf")])
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ExtractionConfig::default();
        config.render.dpi = 0;
        let err = Extractor::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_default_ranking_finishes_rejected_pages() {
        // the real default context, with only the primary stubbed out
        let config = ExtractionConfig::default();
        let fallback = config.ocr.engines[1];
        let engines = EngineContext::new(config.ocr.clone())
            .with_engine(Box::new(Echo(EngineKind::Tesseract, "xx", Some(35.0))))
            .with_engine(Box::new(Echo(fallback, "fallback text", None)));
        let extractor = Extractor::with_engines(config, engines).unwrap();

        let pages = extractor.extract_paged(&FakePages(vec![""])).unwrap();
        assert_eq!(pages[0].source, Source::from(fallback));
        assert!(fallback.is_available());
    }

    #[cfg(not(feature = "neural"))]
    #[test]
    fn test_unavailable_engine_rejected_up_front() {
        let mut config = ExtractionConfig::default();
        config.ocr.engines = vec![EngineKind::Tesseract, EngineKind::Trocr];
        let err = Extractor::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("trocr"));

        assert!(Extractor::new(ExtractionConfig::default()).is_ok());
    }

    #[test]
    fn test_extractor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Extractor>();
    }
}
