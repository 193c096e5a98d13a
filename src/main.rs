//! Document page extractor - command line entry point
//!
//! Extracts per-page text from PDF, DOCX and image files and writes one JSON
//! page list per document.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use doc_page_extractor::output::{output_file_name, write_json_pages};
use doc_page_extractor::{
    to_json, EngineKind, ErrorKind, ExtractionConfig, Extractor, Format, OcrStrategy, PageRecord,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the combined output when images are treated as one document
const IMAGE_SET_OUTPUT: &str = "images_pages.json";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Gated,
    BestLetterRatio,
}

impl From<StrategyArg> for OcrStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Gated => OcrStrategy::Gated,
            StrategyArg::BestLetterRatio => OcrStrategy::BestLetterRatio,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "doc-page-extractor", version, about = "Per-page text extraction with OCR fallback")]
struct Cli {
    /// Input files or glob patterns (PDF, DOCX, PNG, JPEG, BMP, TIFF, GIF)
    #[arg(required = true)]
    inputs: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write `<name>_pages.json` files here instead of printing to stdout
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Ranked OCR engines, comma separated (tesseract, trocr, ppocr, segmented)
    #[arg(long, value_delimiter = ',', value_parser = parse_engine)]
    engines: Option<Vec<EngineKind>>,

    /// How OCR engines compete for a page
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Rasterization resolution for PDF pages
    #[arg(long)]
    dpi: Option<u32>,

    /// Dictionary language for gibberish detection
    #[arg(long)]
    language: Option<String>,

    /// Word list or hunspell .dic file for gibberish detection
    #[arg(long)]
    dictionary: Option<PathBuf>,

    #[arg(long)]
    min_text_len: Option<usize>,

    #[arg(long)]
    min_letter_ratio: Option<f64>,

    #[arg(long)]
    gibberish_threshold: Option<f64>,

    #[arg(long)]
    min_confidence: Option<f32>,

    /// Tesseract language pack(s), e.g. `ron` or `ron+eng`
    #[arg(long)]
    tesseract_lang: Option<String>,

    /// Documents processed in parallel (default: available cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Combine all image inputs into one page list; PDF and DOCX inputs
    /// still get their own
    #[arg(long)]
    images_as_document: bool,

    /// Initialize every configured OCR engine before reading any input
    #[arg(long)]
    preload: bool,
}

fn parse_engine(name: &str) -> Result<EngineKind, String> {
    EngineKind::parse(name).ok_or_else(|| format!("unknown OCR engine '{}'", name))
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<ExtractionConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractionConfig::from_toml_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => ExtractionConfig::default(),
        };

        if let Some(engines) = &self.engines {
            config.ocr.engines = engines.clone();
        }
        if let Some(strategy) = self.strategy {
            config.ocr.strategy = strategy.into();
        }
        if let Some(dpi) = self.dpi {
            config.render.dpi = dpi;
        }
        if let Some(language) = &self.language {
            config.quality.language = language.clone();
        }
        if let Some(dictionary) = &self.dictionary {
            config.quality.dictionary_path = Some(dictionary.clone());
        }
        if let Some(min) = self.min_text_len {
            config.quality.min_text_len = min;
        }
        if let Some(ratio) = self.min_letter_ratio {
            config.quality.min_letter_ratio = ratio;
        }
        if let Some(threshold) = self.gibberish_threshold {
            config.quality.gibberish_threshold = threshold;
        }
        if let Some(confidence) = self.min_confidence {
            config.quality.min_confidence = confidence;
        }
        if let Some(lang) = &self.tesseract_lang {
            config.ocr.tesseract.language = lang.clone();
        }
        Ok(config)
    }

    /// Expand glob patterns; plain paths are kept even when they do not exist
    /// so the extractor can report them.
    fn input_paths(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for input in &self.inputs {
            if !input.contains(&['*', '?', '['][..]) {
                paths.push(PathBuf::from(input));
                continue;
            }
            let matches = glob::glob(input).with_context(|| format!("invalid pattern {}", input))?;
            let before = paths.len();
            for entry in matches {
                match entry {
                    Ok(path) if path.is_file() => paths.push(path),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
                }
            }
            if paths.len() == before {
                tracing::warn!(pattern = %input, "pattern matched no files");
            }
        }
        Ok(paths)
    }
}

/// Split inputs into images and everything else, keeping input order.
fn partition_images(paths: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<PathBuf>) {
    paths
        .into_iter()
        .partition(|path| matches!(Format::from_path(path), Ok(Format::Image)))
}

fn emit(pages: &[PageRecord], input: &Path, output_dir: Option<&Path>) -> anyhow::Result<()> {
    match output_dir {
        Some(dir) => {
            let target = dir.join(output_file_name(input));
            write_json_pages(pages, &target)?;
            tracing::info!(input = %input.display(), output = %target.display(), pages = pages.len(), "wrote page list");
        }
        None => println!("{}", to_json(pages)?),
    }
    Ok(())
}

async fn run_image_set(
    extractor: Arc<Extractor>,
    paths: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let pages = tokio::task::spawn_blocking(move || extractor.extract_image_set(&paths)).await??;
    match output_dir {
        Some(dir) => {
            let target = dir.join(IMAGE_SET_OUTPUT);
            write_json_pages(&pages, &target)?;
            tracing::info!(output = %target.display(), pages = pages.len(), "wrote image set page list");
        }
        None => println!("{}", to_json(&pages)?),
    }
    Ok(())
}

async fn run_documents(
    extractor: Arc<Extractor>,
    paths: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    jobs: usize,
) -> anyhow::Result<()> {
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = Vec::with_capacity(paths.len());

    for path in paths {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let extractor = Arc::clone(&extractor);
        let task_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            extractor.extract_or_empty(&task_path)
        });
        tasks.push((path, handle));
    }

    let mut written = 0usize;
    let mut skipped = 0usize;
    for (path, handle) in tasks {
        match handle.await? {
            Ok(pages) => {
                emit(&pages, &path, output_dir.as_deref())?;
                written += 1;
            }
            Err(e) if e.kind() == ErrorKind::UnsupportedFormat => {
                tracing::error!(path = %path.display(), error = %e, "skipping file");
                skipped += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("processing {}", path.display())));
            }
        }
    }

    tracing::info!(written, skipped, "done");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_page_extractor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let mut paths = cli.input_paths()?;
    if paths.is_empty() {
        anyhow::bail!("no input files");
    }

    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }

    let engines = config.ocr.engines.clone();
    let extractor = Arc::new(Extractor::new(config)?);
    tracing::info!(engines = ?engines, inputs = paths.len(), "starting extraction");

    if cli.preload {
        let warm = Arc::clone(&extractor);
        tokio::task::spawn_blocking(move || warm.engines().warm_up(&engines)).await??;
    }

    if cli.images_as_document {
        let (images, documents) = partition_images(paths);
        if !images.is_empty() {
            run_image_set(Arc::clone(&extractor), images, cli.output_dir.clone()).await?;
        }
        if documents.is_empty() {
            return Ok(());
        }
        paths = documents;
    }

    let jobs = cli
        .jobs
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
        .max(1);
    run_documents(extractor, paths, cli.output_dir, jobs).await
}
