//! Segmented line recognition: binarize, split into lines, recognize each line

use super::segment::{binarize, segment_lines};
use super::{EngineKind, OcrEngine, OcrResult, TesseractEngine};
use crate::config::{SegmentedSettings, TesseractSettings};
use crate::error::Result;
use image::{imageops, DynamicImage, GrayImage};

/// Handles pages where whole-page layout analysis fails, typically
/// handwriting or sparse forms. Reports no confidence.
pub struct SegmentedEngine {
    settings: SegmentedSettings,
    line_recognizer: Box<dyn OcrEngine>,
}

impl SegmentedEngine {
    pub fn new(tesseract: &TesseractSettings, settings: &SegmentedSettings) -> Result<Self> {
        let line_recognizer = TesseractEngine::line_mode(tesseract, settings.line_psm)?;
        Ok(Self::with_line_recognizer(
            settings.clone(),
            Box::new(line_recognizer),
        ))
    }

    /// Use any engine as the per-line recognizer.
    pub fn with_line_recognizer(
        settings: SegmentedSettings,
        line_recognizer: Box<dyn OcrEngine>,
    ) -> Self {
        Self {
            settings,
            line_recognizer,
        }
    }

    fn recognize_gray(&mut self, gray: &GrayImage) -> Result<String> {
        let binary = binarize(gray);
        let lines = segment_lines(&binary, &self.settings);
        tracing::debug!(lines = lines.len(), "segmented page into lines");

        let width = binary.width();
        let mut texts = Vec::with_capacity(lines.len());
        for region in lines {
            let crop = imageops::crop_imm(&binary, 0, region.top, width, region.height()).to_image();
            let result = self
                .line_recognizer
                .recognize(&DynamicImage::ImageLuma8(crop))?;
            let text = result.text.trim();
            if !text.is_empty() {
                texts.push(text.to_string());
            }
        }
        Ok(texts.join(" "))
    }
}

impl OcrEngine for SegmentedEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Segmented
    }

    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrResult> {
        let gray = image.to_luma8();
        let text = self.recognize_gray(&gray)?;
        Ok(OcrResult::new(text, None))
    }
}
