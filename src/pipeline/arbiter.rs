//! Per-page choice between native text and ranked OCR engines

use super::aggregate::Candidate;
use crate::config::OcrStrategy;
use crate::error::{Error, ErrorKind, Result};
use crate::normalize::normalize;
use crate::ocr::{EngineContext, EngineKind, OcrResult};
use crate::quality::{letter_ratio, QualityEvaluator};
use image::DynamicImage;

/// Decides the text of a single page.
///
/// Native text wins when it passes the quality gate. Otherwise the page image
/// is produced (only then) and handed to the OCR strategy.
pub struct Arbiter<'a> {
    quality: &'a QualityEvaluator,
    engines: &'a EngineContext,
    strategy: OcrStrategy,
    ranked: &'a [EngineKind],
}

impl<'a> Arbiter<'a> {
    pub fn new(
        quality: &'a QualityEvaluator,
        engines: &'a EngineContext,
        strategy: OcrStrategy,
        ranked: &'a [EngineKind],
    ) -> Self {
        Self {
            quality,
            engines,
            strategy,
            ranked,
        }
    }

    /// Choose the text for `page`. `render` is only called when OCR is needed.
    pub fn arbitrate<F>(&self, page: u32, native: Option<&str>, render: F) -> Result<Candidate>
    where
        F: FnOnce() -> Result<DynamicImage>,
    {
        if let Some(text) = native {
            if self.quality.accepts_native(text) {
                tracing::debug!(page, "native text accepted");
                return Ok(Candidate::native(text));
            }
            tracing::debug!(page, chars = text.chars().count(), "native text rejected");
        }

        let image = render()?;
        self.recognize(page, &image)
    }

    /// OCR-only path, used for pages that never have native text.
    pub fn recognize(&self, page: u32, image: &DynamicImage) -> Result<Candidate> {
        match self.strategy {
            OcrStrategy::Gated => self.gated(page, image),
            OcrStrategy::BestLetterRatio => self.best_letter_ratio(page, image),
        }
    }

    /// Run one engine. Initialization failures propagate; recognition
    /// failures come back as `Ok(Err(_))` so the caller can move on.
    fn run(
        &self,
        kind: EngineKind,
        page: u32,
        image: &DynamicImage,
    ) -> Result<std::result::Result<OcrResult, Error>> {
        match self.engines.recognize(kind, image) {
            Ok(result) => Ok(Ok(result)),
            Err(e) if e.kind() == ErrorKind::EngineInitialization => Err(e),
            Err(e) => {
                tracing::warn!(page, engine = %kind, error = %e, "OCR engine failed on page");
                Ok(Err(e.at_page(page)))
            }
        }
    }

    fn gated(&self, page: u32, image: &DynamicImage) -> Result<Candidate> {
        let mut rejected: Option<Candidate> = None;
        let mut last_error: Option<Error> = None;

        for (position, &kind) in self.ranked.iter().enumerate() {
            let is_final = position + 1 == self.ranked.len();
            match self.run(kind, page, image)? {
                Ok(result) => {
                    if is_final || self.quality.accepts_ocr(&result) {
                        tracing::debug!(page, engine = %kind, confidence = ?result.confidence, "OCR result emitted");
                        return Ok(Candidate::ocr(kind, result.text, result.confidence));
                    }
                    tracing::debug!(page, engine = %kind, confidence = ?result.confidence, "OCR result rejected");
                    rejected = Some(Candidate::ocr(kind, result.text, result.confidence));
                }
                Err(e) => last_error = Some(e),
            }
        }

        match (rejected, last_error) {
            (Some(candidate), _) => {
                tracing::warn!(page, engine = %candidate.source, "final OCR engine failed, keeping earlier result");
                Ok(candidate)
            }
            (None, Some(e)) => Err(e),
            (None, None) => Err(no_engines(page)),
        }
    }

    fn best_letter_ratio(&self, page: u32, image: &DynamicImage) -> Result<Candidate> {
        let mut best: Option<(f64, Candidate)> = None;
        let mut last_error: Option<Error> = None;

        for &kind in self.ranked {
            match self.run(kind, page, image)? {
                Ok(result) => {
                    let ratio = letter_ratio(&normalize(&result.text));
                    tracing::debug!(page, engine = %kind, ratio, "OCR letter ratio");
                    // Strictly greater: ties keep the engine listed first
                    if best.as_ref().map_or(true, |(top, _)| ratio > *top) {
                        best = Some((ratio, Candidate::ocr(kind, result.text, result.confidence)));
                    }
                }
                Err(e) => last_error = Some(e),
            }
        }

        match (best, last_error) {
            (Some((_, candidate)), _) => Ok(candidate),
            (None, Some(e)) => Err(e),
            (None, None) => Err(no_engines(page)),
        }
    }
}

fn no_engines(page: u32) -> Error {
    Error::Recognition {
        engine: "none".to_string(),
        page,
        reason: "no OCR engines configured".to_string(),
    }
}
