//! Document Page Text Extraction Library
//!
//! Turns a PDF, DOCX or raster image into an ordered list of per-page text
//! records. For every page the embedded text layer is used when it passes a
//! quality gate; otherwise the page is rendered and handed to a ranked list
//! of OCR engines:
//! - `native`: PDF text layer or DOCX body paragraphs
//! - `tesseract`: Tesseract CLI with per-word confidences
//! - `trocr` / `ppocr`: ONNX models, behind the `neural` feature
//! - `segmented`: Otsu binarization, line segmentation, per-line recognition
//!
//! ```no_run
//! use doc_page_extractor::{ExtractionConfig, Extractor};
//! use std::path::Path;
//!
//! let extractor = Extractor::new(ExtractionConfig::default())?;
//! for page in extractor.extract(Path::new("scan.pdf"))? {
//!     println!("{} [{}] {}", page.page_number, page.source, page.text);
//! }
//! # Ok::<(), doc_page_extractor::Error>(())
//! ```

pub mod config;
pub mod docx;
pub mod error;
pub mod normalize;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod quality;

pub use config::{ExtractionConfig, OcrStrategy};
pub use error::{Error, ErrorKind, Result};
pub use normalize::normalize;
pub use ocr::{EngineContext, EngineKind, OcrEngine, OcrResult};
pub use output::{to_json, write_json_pages};
pub use pipeline::{extract, Document, Extractor, Format, PageRecord, Source};
pub use quality::{Dictionary, QualityEvaluator};
