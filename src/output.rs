//! JSON export of page records

use crate::error::Result;
use crate::pipeline::PageRecord;
use std::path::Path;

/// Pretty-printed JSON array of page records. Non-ASCII text is kept as is.
pub fn to_json(pages: &[PageRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(pages)?)
}

/// Write the page records of one document to `path`.
pub fn write_json_pages(pages: &[PageRecord], path: &Path) -> Result<()> {
    let mut json = to_json(pages)?;
    json.push('\n');
    std::fs::write(path, json)?;
    tracing::debug!(path = %path.display(), pages = pages.len(), "page records written");
    Ok(())
}

/// Output file name used for a document: `<stem>_pages.json`.
pub fn output_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    format!("{}_pages.json", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Source;
    use pretty_assertions::assert_eq;

    fn pages() -> Vec<PageRecord> {
        vec![
            PageRecord {
                page_number: 1,
                text: "Școala de vară".to_string(),
                source: Source::Native,
                confidence: None,
            },
            PageRecord {
                page_number: 2,
                text: "scanned".to_string(),
                source: Source::Tesseract,
                confidence: Some(87.5),
            },
        ]
    }

    #[test]
    fn test_json_layout() {
        let json = to_json(&pages()).unwrap();
        let expected = r#"[
  {
    "page": 1,
    "text": "Școala de vară",
    "ocr_model": "native"
  },
  {
    "page": 2,
    "text": "scanned",
    "ocr_model": "tesseract",
    "confidence": 87.5
  }
]"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(output_file_name(Path::new("/in/scan.final.pdf")));
        assert!(path.ends_with("scan.final_pages.json"));

        write_json_pages(&pages(), &path).unwrap();
        let back: Vec<PageRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, pages());
    }
}
