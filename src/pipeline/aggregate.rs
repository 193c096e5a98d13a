//! Page records and their assembly

use crate::normalize::normalize;
use crate::ocr::EngineKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the text of a page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Embedded text layer or DOCX paragraphs
    Native,
    Tesseract,
    Trocr,
    Ppocr,
    Segmented,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Native => "native",
            Source::Tesseract => "tesseract",
            Source::Trocr => "trocr",
            Source::Ppocr => "ppocr",
            Source::Segmented => "segmented",
        }
    }

    pub fn is_ocr(&self) -> bool {
        *self != Source::Native
    }
}

impl From<EngineKind> for Source {
    fn from(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Tesseract => Source::Tesseract,
            EngineKind::Trocr => Source::Trocr,
            EngineKind::Ppocr => Source::Ppocr,
            EngineKind::Segmented => Source::Segmented,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final text of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based, contiguous within a document
    #[serde(rename = "page")]
    pub page_number: u32,
    /// Normalized text
    pub text: String,
    #[serde(rename = "ocr_model")]
    pub source: Source,
    /// Mean OCR confidence (0-100) when the emitting engine reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Text chosen for a page before normalization and numbering
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub source: Source,
    pub confidence: Option<f32>,
}

impl Candidate {
    pub fn native(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: Source::Native,
            confidence: None,
        }
    }

    pub fn ocr(kind: EngineKind, text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            source: kind.into(),
            confidence,
        }
    }
}

/// Collects candidates in page order and numbers them densely from 1
#[derive(Debug, Default)]
pub struct PageAggregator {
    pages: Vec<PageRecord>,
}

impl PageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pages: Vec::with_capacity(capacity),
        }
    }

    /// Append the next page. Returns the page number it was given.
    pub fn push(&mut self, candidate: Candidate) -> u32 {
        let page_number = self.next_page_number();
        self.pages.push(PageRecord {
            page_number,
            text: normalize(&candidate.text),
            source: candidate.source,
            confidence: candidate.confidence,
        });
        page_number
    }

    /// Number the next pushed page will receive.
    pub fn next_page_number(&self) -> u32 {
        self.pages.len() as u32 + 1
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn finish(self) -> Vec<PageRecord> {
        self.pages
    }
}
