//! Tesseract CLI backend

use super::{EngineKind, OcrEngine, OcrResult};
use crate::config::TesseractSettings;
use crate::error::{Error, Result};
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Column holding the word confidence in `tesseract ... tsv` output
const TSV_CONF: usize = 10;
/// Column holding the recognized word
const TSV_TEXT: usize = 11;

/// Runs the `tesseract` binary on a temporary PNG and reads its TSV report
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
    page_seg_mode: Option<u8>,
    /// Engine named in errors; `segmented` when used as its line recognizer
    reported_as: EngineKind,
}

impl TesseractEngine {
    /// Probe the binary and check that every requested language pack is installed.
    pub fn new(settings: &TesseractSettings) -> Result<Self> {
        let engine = Self {
            binary: settings.binary.clone(),
            language: settings.language.clone(),
            page_seg_mode: settings.page_seg_mode,
            reported_as: EngineKind::Tesseract,
        };
        engine.probe()?;
        Ok(engine)
    }

    /// Variant that treats every image as a single text line.
    pub fn line_mode(settings: &TesseractSettings, psm: u8) -> Result<Self> {
        let engine = Self {
            binary: settings.binary.clone(),
            language: settings.language.clone(),
            page_seg_mode: Some(psm),
            reported_as: EngineKind::Segmented,
        };
        engine.probe()?;
        Ok(engine)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn probe(&self) -> Result<()> {
        let reported_as = self.reported_as;
        let output = Command::new(&self.binary)
            .arg("--list-langs")
            .output()
            .map_err(|e| {
                Error::engine_init(
                    reported_as,
                    format!("cannot run {}: {}", self.binary.display(), e),
                )
            })?;

        if !output.status.success() {
            return Err(Error::engine_init(
                reported_as,
                format!("{} --list-langs exited with {}", self.binary.display(), output.status),
            ));
        }

        // Older releases print the language list on stderr
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push('\n');
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        let installed = parse_language_list(&listing);

        for lang in self.language.split('+').filter(|l| !l.is_empty()) {
            if !installed.iter().any(|l| l == lang) {
                return Err(Error::engine_init(
                    reported_as,
                    format!("language pack '{}' is not installed", lang),
                ));
            }
        }

        tracing::debug!(binary = %self.binary.display(), language = %self.language, "tesseract ready");
        Ok(())
    }

    fn run(&self, image_path: &Path) -> Result<OcrResult> {
        let mut command = Command::new(&self.binary);
        command.arg(image_path).arg("stdout").arg("-l").arg(&self.language);
        if let Some(psm) = self.page_seg_mode {
            command.arg("--psm").arg(psm.to_string());
        }
        command.arg("tsv");

        let output = command
            .output()
            .map_err(|e| Error::recognition(self.reported_as, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::recognition(
                self.reported_as,
                format!("exit status {}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl OcrEngine for TesseractEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Tesseract
    }

    fn recognize(&mut self, image: &DynamicImage) -> Result<OcrResult> {
        let file = tempfile::Builder::new()
            .prefix("ocr-page-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(file.path(), ImageFormat::Png)?;
        self.run(file.path())
    }
}

fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of") && !line.contains(' '))
        .map(str::to_string)
        .collect()
}

/// Turn tesseract TSV output into text plus mean word confidence.
///
/// Structural rows (confidence -1) and empty tokens are skipped. A page with
/// no words yields empty text at confidence 0.
pub fn parse_tsv(tsv: &str) -> OcrResult {
    let mut words: Vec<&str> = Vec::new();
    let mut conf_sum = 0.0f32;

    for line in tsv.lines().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() <= TSV_TEXT {
            continue;
        }
        let text = cols[TSV_TEXT].trim();
        if text.is_empty() {
            continue;
        }
        let conf: f32 = match cols[TSV_CONF].trim().parse() {
            Ok(c) if c >= 0.0 => c,
            _ => continue,
        };
        words.push(text);
        conf_sum += conf;
    }

    if words.is_empty() {
        return OcrResult::new("", Some(0.0));
    }
    let mean = conf_sum / words.len() as f32;
    OcrResult::new(words.join(" "), Some(mean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn row(conf: &str, text: &str) -> String {
        format!("5\t1\t1\t1\t1\t1\t10\t10\t40\t12\t{}\t{}", conf, text)
    }

    #[test]
    fn test_parse_tsv_mean_confidence() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t800\t1000\t-1\t".to_string(),
            row("90", "Bună"),
            row("70.5", "ziua"),
            row("-1", ""),
            row("80", "   "),
        ]
        .join("\n");

        let result = parse_tsv(&tsv);
        assert_eq!(result.text, "Bună ziua");
        let conf = result.confidence.unwrap();
        assert!((conf - 80.25).abs() < 1e-4);
    }

    #[test]
    fn test_parse_tsv_without_words() {
        let result = parse_tsv(HEADER);
        assert_eq!(result, OcrResult::new("", Some(0.0)));
        assert_eq!(parse_tsv(""), OcrResult::new("", Some(0.0)));
    }

    #[test]
    fn test_language_list_parsing() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nosd\nron\n";
        assert_eq!(parse_language_list(listing), vec!["eng", "osd", "ron"]);
    }

    #[test]
    fn test_missing_binary_is_initialization_error() {
        let settings = TesseractSettings {
            binary: PathBuf::from("/nonexistent/bin/tesseract"),
            ..TesseractSettings::default()
        };
        let err = TesseractEngine::new(&settings).unwrap_err();
        assert!(matches!(err, Error::EngineInitialization { ref engine, .. } if engine == "tesseract"));

        let err = TesseractEngine::line_mode(&settings, 7).unwrap_err();
        assert!(matches!(err, Error::EngineInitialization { ref engine, .. } if engine == "segmented"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_run_names_the_calling_engine() {
        let mut line_recognizer = TesseractEngine {
            binary: PathBuf::from("false"),
            language: "ron".to_string(),
            page_seg_mode: Some(7),
            reported_as: EngineKind::Segmented,
        };
        let err = line_recognizer
            .recognize(&DynamicImage::new_luma8(8, 8))
            .unwrap_err();
        assert!(matches!(err, Error::Recognition { ref engine, .. } if engine == "segmented"));
    }
}
