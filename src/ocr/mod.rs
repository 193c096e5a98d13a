//! OCR engine layer
//!
//! Every backend implements [`OcrEngine`]. Engines are expensive to create
//! (binary probing, model loading), so they are only ever built through an
//! [`EngineContext`], which creates each one lazily and keeps it for the
//! lifetime of the context.

mod context;
mod segment;
mod segmented;
mod tesseract;

#[cfg(feature = "neural")]
mod ppocr;
#[cfg(feature = "neural")]
mod trocr;

pub use context::{EngineContext, EngineHandle};
pub use segment::{binarize, segment_lines, LineRegion};
pub use segmented::SegmentedEngine;
pub use tesseract::{parse_tsv, TesseractEngine};

#[cfg(feature = "neural")]
pub use ppocr::PpOcrEngine;
#[cfg(feature = "neural")]
pub use trocr::TrOcrEngine;

use crate::config::OcrConfig;
use crate::error::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an OCR backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Tesseract CLI, reports per-word confidences
    Tesseract,
    /// TrOCR transformer tuned for handwriting, no confidence signal
    Trocr,
    /// PP-OCR style multilingual CTC recognizer
    Ppocr,
    /// Binarization, line segmentation and per-line recognition
    Segmented,
}

impl EngineKind {
    pub const ALL: [EngineKind; 4] = [
        EngineKind::Tesseract,
        EngineKind::Trocr,
        EngineKind::Ppocr,
        EngineKind::Segmented,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Tesseract => "tesseract",
            EngineKind::Trocr => "trocr",
            EngineKind::Ppocr => "ppocr",
            EngineKind::Segmented => "segmented",
        }
    }

    /// Whether this build can construct the engine.
    pub fn is_available(&self) -> bool {
        match self {
            EngineKind::Tesseract | EngineKind::Segmented => true,
            EngineKind::Trocr | EngineKind::Ppocr => cfg!(feature = "neural"),
        }
    }

    /// Ranked engines used when the configuration names none: tesseract, then
    /// the handwriting model when built in, else per-line recognition.
    pub fn default_ranking() -> Vec<EngineKind> {
        if cfg!(feature = "neural") {
            vec![EngineKind::Tesseract, EngineKind::Trocr]
        } else {
            vec![EngineKind::Tesseract, EngineKind::Segmented]
        }
    }

    /// Parse an engine name as used in configuration files and CLI flags.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text produced by a single engine invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrResult {
    pub text: String,
    /// Mean confidence on a 0-100 scale, when the engine reports one
    pub confidence: Option<f32>,
}

impl OcrResult {
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A recognition backend.
///
/// `recognize` takes `&mut self` because model sessions are not reentrant;
/// the [`EngineContext`] serializes access.
pub trait OcrEngine: Send {
    fn kind(&self) -> EngineKind;

    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrResult>;
}

/// Construct the engine for `kind`. Failures are always
/// [`crate::Error::EngineInitialization`].
pub fn build_engine(kind: EngineKind, config: &OcrConfig) -> Result<Box<dyn OcrEngine>> {
    tracing::info!(engine = %kind, "initializing OCR engine");
    match kind {
        EngineKind::Tesseract => Ok(Box::new(TesseractEngine::new(&config.tesseract)?)),
        EngineKind::Segmented => Ok(Box::new(SegmentedEngine::new(
            &config.tesseract,
            &config.segmented,
        )?)),
        EngineKind::Trocr => build_trocr(config),
        EngineKind::Ppocr => build_ppocr(config),
    }
}

#[cfg(feature = "neural")]
fn build_trocr(config: &OcrConfig) -> Result<Box<dyn OcrEngine>> {
    Ok(Box::new(TrOcrEngine::load(&config.trocr, config.intra_threads)?))
}

#[cfg(not(feature = "neural"))]
fn build_trocr(_config: &OcrConfig) -> Result<Box<dyn OcrEngine>> {
    Err(crate::error::Error::engine_init(
        EngineKind::Trocr,
        "built without the `neural` feature",
    ))
}

#[cfg(feature = "neural")]
fn build_ppocr(config: &OcrConfig) -> Result<Box<dyn OcrEngine>> {
    Ok(Box::new(PpOcrEngine::load(
        &config.ppocr,
        &config.segmented,
        config.intra_threads,
    )?))
}

#[cfg(not(feature = "neural"))]
fn build_ppocr(_config: &OcrConfig) -> Result<Box<dyn OcrEngine>> {
    Err(crate::error::Error::engine_init(
        EngineKind::Ppocr,
        "built without the `neural` feature",
    ))
}

#[cfg(feature = "neural")]
fn require_model_file(kind: EngineKind, path: &std::path::Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(crate::error::Error::engine_init(
            kind,
            format!("model file not found: {}", path.display()),
        ))
    }
}

#[cfg(feature = "neural")]
fn onnx_session(
    kind: EngineKind,
    path: &std::path::Path,
    intra_threads: usize,
) -> Result<ort::session::Session> {
    use ort::session::builder::GraphOptimizationLevel;

    require_model_file(kind, path)?;
    ort::session::Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(intra_threads))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| crate::error::Error::engine_init(kind, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_names_round_trip() {
        for kind in EngineKind::ALL {
            assert_eq!(EngineKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EngineKind::parse(" TrOCR "), Some(EngineKind::Trocr));
        assert_eq!(EngineKind::parse("kraken"), None);
    }

    #[test]
    fn test_default_ranking_is_buildable() {
        let ranking = EngineKind::default_ranking();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0], EngineKind::Tesseract);
        assert!(ranking.iter().all(EngineKind::is_available));
        assert_eq!(OcrConfig::default().engines, ranking);
    }

    #[cfg(not(feature = "neural"))]
    #[test]
    fn test_neural_engines_unavailable_without_feature() {
        assert!(!EngineKind::Trocr.is_available());
        assert!(!EngineKind::Ppocr.is_available());
        assert_eq!(
            EngineKind::default_ranking(),
            vec![EngineKind::Tesseract, EngineKind::Segmented]
        );
    }

    #[cfg(not(feature = "neural"))]
    #[test]
    fn test_neural_engines_report_initialization_error() {
        use crate::error::Error;

        let config = OcrConfig::default();
        for kind in [EngineKind::Trocr, EngineKind::Ppocr] {
            let err = build_engine(kind, &config).err().unwrap();
            assert!(matches!(err, Error::EngineInitialization { .. }));
        }
    }
}
