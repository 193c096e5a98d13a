//! Extraction configuration
//!
//! Every knob has a default matching the production behaviour; a TOML file
//! (see [`ExtractionConfig::from_toml_file`]) or the CLI can override any of
//! them.

use crate::error::{Error, Result};
use crate::ocr::EngineKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Thresholds for accepting native or OCR text
    pub quality: QualityConfig,
    /// Rasterization of pages that need OCR
    pub render: RenderConfig,
    /// OCR engine selection and per-engine settings
    pub ocr: OcrConfig,
}

/// Quality thresholds and gibberish dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Dictionary language used for gibberish detection (default: en_US)
    pub language: String,
    /// Explicit word list or hunspell .dic file; overrides `language`
    pub dictionary_path: Option<PathBuf>,
    /// Minimum text length in characters (default: 20)
    pub min_text_len: usize,
    /// Minimum fraction of alphabetic characters (default: 0.6)
    pub min_letter_ratio: f64,
    /// Minimum fraction of dictionary words to be considered real text (default: 0.5)
    pub gibberish_threshold: f64,
    /// Minimum mean OCR confidence, 0-100 (default: 60.0)
    pub min_confidence: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            language: "en_US".to_string(),
            dictionary_path: None,
            min_text_len: 20,
            min_letter_ratio: 0.6,
            gibberish_threshold: 0.5,
            min_confidence: 60.0,
        }
    }
}

/// Page rasterization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Rasterization resolution for PDF pages (default: 200)
    pub dpi: u32,
    /// Width of the blank canvas OCR'd when DOCX text is rejected
    pub blank_width: u32,
    /// Height of the blank canvas OCR'd when DOCX text is rejected
    pub blank_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            blank_width: 800,
            blank_height: 1000,
        }
    }
}

/// How OCR candidates compete for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStrategy {
    /// Walk the ranked engine list; a non-final engine wins only if its output
    /// passes the confidence/length/gibberish gate, the final engine always wins.
    #[default]
    Gated,
    /// Run every engine and keep the output with the highest letter ratio.
    /// Ties go to the engine listed first.
    BestLetterRatio,
}

/// OCR engine selection and settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Arbitration strategy (default: gated)
    pub strategy: OcrStrategy,
    /// Ranked engine list (default: [`EngineKind::default_ranking`])
    pub engines: Vec<EngineKind>,
    pub tesseract: TesseractSettings,
    pub segmented: SegmentedSettings,
    pub trocr: TrOcrSettings,
    pub ppocr: PpOcrSettings,
    /// ONNX Runtime intra-op threads for neural engines
    pub intra_threads: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            strategy: OcrStrategy::Gated,
            engines: EngineKind::default_ranking(),
            tesseract: TesseractSettings::default(),
            segmented: SegmentedSettings::default(),
            trocr: TrOcrSettings::default(),
            ppocr: PpOcrSettings::default(),
            intra_threads: 4,
        }
    }
}

/// Tesseract CLI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractSettings {
    /// Binary name or path (default: tesseract)
    pub binary: PathBuf,
    /// Language(s), `+`-separated (default: ron)
    pub language: String,
    /// Page segmentation mode passed as `--psm`
    pub page_seg_mode: Option<u8>,
}

impl Default for TesseractSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "ron".to_string(),
            page_seg_mode: None,
        }
    }
}

/// Binarize + segment + per-line recognition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentedSettings {
    /// Tesseract page segmentation mode used per line (default: 7, single line)
    pub line_psm: u8,
    /// Lines shorter than this many pixels are treated as noise
    pub min_line_height: u32,
    /// Gaps up to this many pixels are merged into the surrounding line
    pub max_line_gap: u32,
    /// Padding added above and below each line crop
    pub line_padding: u32,
}

impl Default for SegmentedSettings {
    fn default() -> Self {
        Self {
            line_psm: 7,
            min_line_height: 6,
            max_line_gap: 2,
            line_padding: 3,
        }
    }
}

/// TrOCR handwriting model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrOcrSettings {
    pub encoder_path: PathBuf,
    pub decoder_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// Square input size expected by the encoder
    pub image_size: u32,
    pub max_tokens: usize,
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
}

impl Default for TrOcrSettings {
    fn default() -> Self {
        Self {
            encoder_path: PathBuf::from("models/trocr/encoder_model.onnx"),
            decoder_path: PathBuf::from("models/trocr/decoder_model.onnx"),
            tokenizer_path: PathBuf::from("models/trocr/tokenizer.json"),
            image_size: 384,
            max_tokens: 256,
            decoder_start_token_id: 2,
            eos_token_id: 2,
        }
    }
}

/// PP-OCR multilingual recognition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpOcrSettings {
    pub model_path: PathBuf,
    /// Character dictionary, one symbol per line
    pub dict_path: PathBuf,
    /// Recognition input height
    pub input_height: u32,
    /// Upper bound for the resized line width
    pub max_input_width: u32,
}

impl Default for PpOcrSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ppocr/latin_rec.onnx"),
            dict_path: PathBuf::from("models/ppocr/latin_dict.txt"),
            input_height: 48,
            max_input_width: 1280,
        }
    }
}

impl ExtractionConfig {
    /// Load a configuration file. Missing keys take their defaults.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let q = &self.quality;
        if !(0.0..=1.0).contains(&q.min_letter_ratio) {
            return Err(config_error(format!(
                "min_letter_ratio must be within 0..=1, got {}",
                q.min_letter_ratio
            )));
        }
        if !(0.0..=1.0).contains(&q.gibberish_threshold) {
            return Err(config_error(format!(
                "gibberish_threshold must be within 0..=1, got {}",
                q.gibberish_threshold
            )));
        }
        if !(0.0..=100.0).contains(&q.min_confidence) {
            return Err(config_error(format!(
                "min_confidence must be within 0..=100, got {}",
                q.min_confidence
            )));
        }
        if self.render.dpi == 0 {
            return Err(config_error("dpi must be positive"));
        }
        if self.render.blank_width == 0 || self.render.blank_height == 0 {
            return Err(config_error("blank canvas dimensions must be positive"));
        }
        if self.ocr.engines.is_empty() {
            return Err(config_error("at least one OCR engine is required"));
        }
        for (i, kind) in self.ocr.engines.iter().enumerate() {
            if self.ocr.engines[..i].contains(kind) {
                return Err(config_error(format!("OCR engine {} listed twice", kind)));
            }
        }
        if self.ocr.tesseract.language.trim().is_empty() {
            return Err(config_error("tesseract language must not be empty"));
        }
        Ok(())
    }
}

fn config_error(reason: impl Into<String>) -> Error {
    Error::Config {
        reason: reason.into(),
    }
}
