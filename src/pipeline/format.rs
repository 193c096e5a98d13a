//! Input format dispatch by file extension

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "gif"];

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Docx,
    Image,
}

impl Format {
    /// Classify a path by its extension, case-insensitively. The file itself
    /// is never touched.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Format::Pdf),
            "docx" => Ok(Format::Docx),
            ext if IMAGE_EXTENSIONS.contains(&ext) => Ok(Format::Image),
            "" => Err(Error::UnsupportedFormat {
                extension: String::new(),
            }),
            ext => Err(Error::UnsupportedFormat {
                extension: format!(".{}", ext),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Image => "image",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("report.pdf", Format::Pdf)]
    #[case("REPORT.PDF", Format::Pdf)]
    #[case("letter.docx", Format::Docx)]
    #[case("scan.png", Format::Image)]
    #[case("scan.JPG", Format::Image)]
    #[case("scan.jpeg", Format::Image)]
    #[case("scan.bmp", Format::Image)]
    #[case("scan.tiff", Format::Image)]
    #[case("scan.gif", Format::Image)]
    fn test_supported_extensions(#[case] path: &str, #[case] expected: Format) {
        assert_eq!(Format::from_path(Path::new(path)).unwrap(), expected);
    }

    #[rstest]
    #[case("notes.xyz", ".xyz")]
    #[case("legacy.doc", ".doc")]
    #[case("README", "")]
    fn test_unsupported_extensions(#[case] path: &str, #[case] extension: &str) {
        match Format::from_path(Path::new(path)) {
            Err(Error::UnsupportedFormat { extension: ext }) => assert_eq!(ext, extension),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }
}
