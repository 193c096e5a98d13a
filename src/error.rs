//! Error types for the extraction pipeline

use thiserror::Error;

/// Result type alias for the extraction pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used by callers to pick a recovery policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File extension outside the supported set; fatal for that file
    UnsupportedFormat,
    /// An OCR backend could not be loaded; fatal until remedied
    EngineInitialization,
    /// Parsing, rendering or recognition failed for a document
    Extraction,
    /// Invalid configuration, raised before any extraction starts
    Configuration,
}

/// Error types for the extraction pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// File extension is not one of the supported formats
    #[error("Unsupported file type: {extension}")]
    UnsupportedFormat { extension: String },

    /// OCR engine failed to load its binary or model
    #[error("Failed to initialize OCR engine {engine}: {reason}")]
    EngineInitialization { engine: String, reason: String },

    /// Input file not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Invalid DOCX package
    #[error("Invalid DOCX file: {reason}")]
    InvalidDocx { reason: String },

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Every OCR engine invoked for a page failed
    #[error("Recognition failed on page {page} ({engine}): {reason}")]
    Recognition {
        engine: String,
        page: u32,
        reason: String,
    },

    /// ZIP container error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parse error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Classify the error for the caller's recovery policy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Error::EngineInitialization { .. } => ErrorKind::EngineInitialization,
            Error::Config { .. } | Error::TomlParse(_) => ErrorKind::Configuration,
            _ => ErrorKind::Extraction,
        }
    }

    /// Shorthand for `kind() == ErrorKind::Extraction`.
    pub fn is_extraction(&self) -> bool {
        self.kind() == ErrorKind::Extraction
    }

    /// Return a sanitized error message safe to hand to end users.
    /// Internal details (paths, library errors, model locations) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::UnsupportedFormat { extension } => {
                format!("Unsupported file type: {}", extension)
            }
            Error::EngineInitialization { engine, .. } => {
                format!("OCR engine {} is unavailable", engine)
            }
            Error::FileNotFound { .. } => "File not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::InvalidDocx { .. } | Error::Zip(_) | Error::Xml(_) => {
                "Invalid DOCX file".to_string()
            }
            Error::Image(_) => "Image could not be decoded".to_string(),
            Error::Recognition { page, .. } => format!("Text recognition failed on page {}", page),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::Config { .. } | Error::TomlParse(_) => "Invalid configuration".to_string(),
        }
    }

    pub(crate) fn engine_init(engine: impl std::fmt::Display, reason: impl ToString) -> Self {
        Error::EngineInitialization {
            engine: engine.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Recognition failure raised inside an engine. Engines do not know the
    /// page they run on, so the page is 0 until [`Error::at_page`] sets it.
    pub(crate) fn recognition(engine: impl std::fmt::Display, reason: impl ToString) -> Self {
        Error::Recognition {
            engine: engine.to_string(),
            page: 0,
            reason: reason.to_string(),
        }
    }

    /// Attach a page number to a recognition error; other errors pass through.
    pub fn at_page(self, page_number: u32) -> Self {
        match self {
            Error::Recognition { engine, reason, .. } => Error::Recognition {
                engine,
                page: page_number,
                reason,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let unsupported = Error::UnsupportedFormat {
            extension: ".xyz".to_string(),
        };
        assert_eq!(unsupported.kind(), ErrorKind::UnsupportedFormat);
        assert!(!unsupported.is_extraction());

        let init = Error::engine_init("trocr", "model missing");
        assert_eq!(init.kind(), ErrorKind::EngineInitialization);

        let recognition = Error::Recognition {
            engine: "tesseract".to_string(),
            page: 3,
            reason: "exit status 1".to_string(),
        };
        assert!(recognition.is_extraction());

        let config = Error::Config {
            reason: "dpi must be positive".to_string(),
        };
        assert_eq!(config.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_at_page_only_touches_recognition() {
        let err = Error::recognition("tesseract", "exit status 1").at_page(4);
        assert!(matches!(err, Error::Recognition { page: 4, .. }));

        let err = Error::Config {
            reason: "bad".to_string(),
        }
        .at_page(4);
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_client_message_hides_details() {
        let err = Error::FileNotFound {
            path: "/secret/upload/42.pdf".to_string(),
        };
        assert_eq!(err.client_message(), "File not found");

        let err = Error::engine_init("trocr", "/opt/models/encoder.onnx missing");
        assert!(!err.client_message().contains("/opt/models"));
    }
}
