//! PP-OCR style CTC line recognizer on ONNX Runtime

use super::segment::{binarize, segment_lines};
use super::{onnx_session, require_model_file, EngineKind, OcrEngine, OcrResult};
use crate::config::{PpOcrSettings, SegmentedSettings};
use crate::error::{Error, Result};
use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use ort::session::Session;
use ort::value::Value;

const MIN_INPUT_WIDTH: u32 = 16;

/// Multilingual recognizer. The page is split into lines, every line is
/// recognized with greedy CTC decoding and the mean per-character
/// probability, scaled to 0-100, is reported as confidence.
pub struct PpOcrEngine {
    session: Session,
    charset: Vec<String>,
    settings: PpOcrSettings,
    lines: SegmentedSettings,
}

impl PpOcrEngine {
    /// Load the model and charset; `lines` controls how pages are split into lines.
    pub fn load(
        settings: &PpOcrSettings,
        lines: &SegmentedSettings,
        intra_threads: usize,
    ) -> Result<Self> {
        let kind = EngineKind::Ppocr;
        let session = onnx_session(kind, &settings.model_path, intra_threads)?;
        require_model_file(kind, &settings.dict_path)?;
        let charset = std::fs::read_to_string(&settings.dict_path)
            .map_err(|e| Error::engine_init(kind, e))?
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect::<Vec<_>>();

        tracing::info!(
            model = %settings.model_path.display(),
            classes = charset.len(),
            "PP-OCR model loaded"
        );

        Ok(Self {
            session,
            charset,
            settings: settings.clone(),
            lines: lines.clone(),
        })
    }

    fn line_tensor(&self, line: &GrayImage) -> (usize, Vec<f32>) {
        let height = self.settings.input_height;
        let scaled = (line.width() as f32 * height as f32 / line.height().max(1) as f32).round() as u32;
        let width = scaled.clamp(MIN_INPUT_WIDTH, self.settings.max_input_width);
        let rgb = DynamicImage::ImageLuma8(line.clone())
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8();

        let mut data = Vec::with_capacity((3 * width * height) as usize);
        for channel in 0..3 {
            for y in 0..height {
                for x in 0..width {
                    let value = rgb.get_pixel(x, y)[channel] as f32 / 255.0;
                    data.push((value - 0.5) / 0.5);
                }
            }
        }
        (width as usize, data)
    }

    fn recognize_line(&mut self, line: &GrayImage) -> anyhow::Result<(String, Option<f32>)> {
        let (width, data) = self.line_tensor(line);
        let height = self.settings.input_height as usize;
        let input = Value::from_array(([1usize, 3, height, width], data.into_boxed_slice()))?;
        let outputs = self.session.run(ort::inputs![input])?;
        let (shape, probs) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("recognizer output is not a float tensor")?;
        anyhow::ensure!(shape.len() == 3, "unexpected output rank {}", shape.len());
        let steps = shape[1] as usize;
        let classes = shape[2] as usize;
        Ok(ctc_greedy_decode(probs, steps, classes, &self.charset))
    }

    fn run_page(&mut self, image: &DynamicImage) -> anyhow::Result<OcrResult> {
        let gray = image.to_luma8();
        let crops = line_crops(&gray, &self.lines);
        let mut texts = Vec::new();
        let mut scores = Vec::new();

        for crop in crops {
            let (text, score) = self.recognize_line(&crop)?;
            let text = text.trim().to_string();
            if !text.is_empty() {
                texts.push(text);
            }
            scores.extend(score);
        }

        let confidence = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f32>() / scores.len() as f32 * 100.0
        };
        Ok(OcrResult::new(texts.join(" "), Some(confidence)))
    }
}

impl OcrEngine for PpOcrEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Ppocr
    }

    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrResult> {
        self.run_page(image)
            .map_err(|e| Error::recognition(EngineKind::Ppocr, format!("{:#}", e)))
    }
}

/// Grayscale crops of the text lines found on the binarized page.
fn line_crops(gray: &GrayImage, lines: &SegmentedSettings) -> Vec<GrayImage> {
    segment_lines(&binarize(gray), lines)
        .into_iter()
        .map(|region| imageops::crop_imm(gray, 0, region.top, gray.width(), region.height()).to_image())
        .collect()
}

/// Greedy CTC decoding over a `[steps, classes]` probability matrix.
///
/// Class 0 is the blank, class `i` maps to `charset[i - 1]` and the class
/// right after the charset is a space. Returns the text and the mean
/// probability of the emitted characters, `None` when nothing was emitted.
fn ctc_greedy_decode(
    probs: &[f32],
    steps: usize,
    classes: usize,
    charset: &[String],
) -> (String, Option<f32>) {
    let mut text = String::new();
    let mut score_sum = 0.0f32;
    let mut emitted = 0usize;
    let mut previous = 0usize;

    for step in probs.chunks(classes).take(steps) {
        let (best, prob) = step
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |acc, (i, &p)| {
                if p > acc.1 {
                    (i, p)
                } else {
                    acc
                }
            });
        if best != 0 && best != previous {
            let symbol = match charset.get(best - 1) {
                Some(s) => s.as_str(),
                None => " ",
            };
            text.push_str(symbol);
            score_sum += prob;
            emitted += 1;
        }
        previous = best;
    }

    let score = (emitted > 0).then(|| score_sum / emitted as f32);
    (text, score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charset() -> Vec<String> {
        ["a", "b", "ș"].iter().map(|s| s.to_string()).collect()
    }

    fn one_hot(sequence: &[usize], classes: usize) -> Vec<f32> {
        let mut probs = vec![0.0; sequence.len() * classes];
        for (t, &c) in sequence.iter().enumerate() {
            probs[t * classes + c] = 0.8;
        }
        probs
    }

    #[test]
    fn test_ctc_collapses_repeats_and_blanks() {
        // a a _ a b b <space> ș
        let seq = [1, 1, 0, 1, 2, 2, 4, 3];
        let (text, score) = ctc_greedy_decode(&one_hot(&seq, 5), seq.len(), 5, &charset());
        assert_eq!(text, "aab ș");
        assert!((score.unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_ctc_all_blank() {
        let seq = [0, 0, 0];
        let (text, score) = ctc_greedy_decode(&one_hot(&seq, 5), seq.len(), 5, &charset());
        assert_eq!(text, "");
        assert_eq!(score, None);
    }

    #[test]
    fn test_line_crops_follow_segmentation_settings() {
        let mut gray = GrayImage::from_pixel(120, 60, image::Luma([240]));
        for (top, bottom) in [(10u32, 20u32), (26, 36)] {
            for y in top..bottom {
                for x in 10..110 {
                    gray.put_pixel(x, y, image::Luma([20]));
                }
            }
        }
        let tight = SegmentedSettings {
            line_psm: 7,
            min_line_height: 4,
            max_line_gap: 2,
            line_padding: 0,
        };
        let heights: Vec<u32> = line_crops(&gray, &tight).iter().map(|c| c.height()).collect();
        assert_eq!(heights, vec![10, 10]);

        let loose = SegmentedSettings {
            max_line_gap: 10,
            ..tight
        };
        let heights: Vec<u32> = line_crops(&gray, &loose).iter().map(|c| c.height()).collect();
        assert_eq!(heights, vec![26]);
    }

    #[test]
    fn test_missing_model_is_initialization_error() {
        let settings = PpOcrSettings {
            model_path: "/nonexistent/rec.onnx".into(),
            ..PpOcrSettings::default()
        };
        let err = PpOcrEngine::load(&settings, &SegmentedSettings::default(), 1).err().unwrap();
        assert!(matches!(err, Error::EngineInitialization { .. }));
    }
}
