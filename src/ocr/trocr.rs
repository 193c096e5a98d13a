//! TrOCR encoder/decoder backend on ONNX Runtime

use super::{onnx_session, require_model_file, EngineKind, OcrEngine, OcrResult};
use crate::config::TrOcrSettings;
use crate::error::{Error, Result};
use anyhow::Context;
use image::imageops::FilterType;
use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;
use tokenizers::Tokenizer;

/// Transformer OCR for handwriting. Greedy decoding, no confidence signal.
pub struct TrOcrEngine {
    encoder: Session,
    decoder: Session,
    tokenizer: Tokenizer,
    settings: TrOcrSettings,
}

impl TrOcrEngine {
    /// Load both ONNX graphs and the tokenizer.
    pub fn load(settings: &TrOcrSettings, intra_threads: usize) -> Result<Self> {
        let kind = EngineKind::Trocr;
        let encoder = onnx_session(kind, &settings.encoder_path, intra_threads)?;
        let decoder = onnx_session(kind, &settings.decoder_path, intra_threads)?;

        require_model_file(kind, &settings.tokenizer_path)?;
        let tokenizer = Tokenizer::from_file(&settings.tokenizer_path)
            .map_err(|e| Error::engine_init(EngineKind::Trocr, e))?;

        tracing::info!(
            encoder = %settings.encoder_path.display(),
            decoder = %settings.decoder_path.display(),
            "TrOCR models loaded"
        );

        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            settings: settings.clone(),
        })
    }

    fn pixel_values(&self, image: &DynamicImage) -> Vec<f32> {
        let size = self.settings.image_size;
        let rgb = image
            .resize_exact(size, size, FilterType::Lanczos3)
            .to_rgb8();
        let mut pixels = Vec::with_capacity((3 * size * size) as usize);
        for channel in 0..3 {
            for y in 0..size {
                for x in 0..size {
                    let value = rgb.get_pixel(x, y)[channel] as f32 / 255.0;
                    pixels.push((value - 0.5) / 0.5);
                }
            }
        }
        pixels
    }

    fn generate(&mut self, image: &DynamicImage) -> anyhow::Result<String> {
        let size = self.settings.image_size as usize;
        let pixels = self.pixel_values(image);
        let input = Value::from_array(([1usize, 3, size, size], pixels.into_boxed_slice()))?;
        let encoder_outputs = self.encoder.run(ort::inputs![input])?;
        let (hidden_shape, hidden) = encoder_outputs[0]
            .try_extract_tensor::<f32>()
            .context("encoder output is not a float tensor")?;
        let hidden_shape: Vec<i64> = hidden_shape.to_vec();
        let hidden: Vec<f32> = hidden.to_vec();

        let mut ids: Vec<i64> = vec![self.settings.decoder_start_token_id as i64];
        let mut generated: Vec<u32> = Vec::new();

        for _ in 0..self.settings.max_tokens {
            let input_ids = Value::from_array(([1usize, ids.len()], ids.clone().into_boxed_slice()))?;
            let states = Value::from_array((hidden_shape.clone(), hidden.clone().into_boxed_slice()))?;
            let outputs = self.decoder.run(ort::inputs![
                "input_ids" => input_ids,
                "encoder_hidden_states" => states
            ])?;

            let (logits_shape, logits) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("decoder output is not a float tensor")?;
            anyhow::ensure!(logits_shape.len() == 3, "unexpected logits rank {}", logits_shape.len());
            let vocab = logits_shape[2] as usize;
            let last = (logits_shape[1] as usize - 1) * vocab;
            let next = argmax(&logits[last..last + vocab]);

            if next == self.settings.eos_token_id {
                break;
            }
            generated.push(next);
            ids.push(next as i64);
        }

        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| anyhow::anyhow!("token decoding failed: {}", e))?;
        Ok(text.trim().to_string())
    }
}

impl OcrEngine for TrOcrEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Trocr
    }

    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrResult> {
        let text = self
            .generate(image)
            .map_err(|e| Error::recognition(EngineKind::Trocr, format!("{:#}", e)))?;
        Ok(OcrResult::new(text, None))
    }
}

fn argmax(values: &[f32]) -> u32 {
    values
        .iter()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
        .0 as u32
}
