//! DOCX package access
//!
//! A `.docx` file is a ZIP archive of Open XML parts. The pipeline needs two
//! things from it: the body paragraphs of `word/document.xml` and the raster
//! images the document references, in relationship order.

mod reader;

pub use reader::{parse_body_paragraphs, parse_image_relationships, ImageRelationship};

use crate::error::{Error, Result};
use image::ImageFormat;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// An image part embedded in the package
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Part name, e.g. `word/media/image1.png`
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Body text and embedded raster images of a DOCX file
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    pub paragraphs: Vec<String>,
    pub images: Vec<EmbeddedImage>,
}

impl DocxPackage {
    /// Open and parse a DOCX file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a DOCX package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let document = read_part(&mut archive, DOCUMENT_PART)?.ok_or_else(|| Error::InvalidDocx {
            reason: format!("missing {}", DOCUMENT_PART),
        })?;
        let paragraphs = parse_body_paragraphs(&document)?;

        let images = match read_part(&mut archive, DOCUMENT_RELS_PART)? {
            Some(rels) => load_images(&mut archive, &parse_image_relationships(&rels)?)?,
            None => Vec::new(),
        };

        tracing::debug!(
            paragraphs = paragraphs.len(),
            images = images.len(),
            "DOCX package parsed"
        );

        Ok(Self { paragraphs, images })
    }

    /// Body text as one string, one paragraph per line.
    pub fn text(&self) -> String {
        self.paragraphs.join("\n")
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

fn load_images<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &[ImageRelationship],
) -> Result<Vec<EmbeddedImage>> {
    let mut images = Vec::with_capacity(relationships.len());
    for rel in relationships {
        if !is_raster(&rel.part) {
            // EMF, WMF and SVG parts cannot be decoded into pixels
            tracing::debug!(part = %rel.part, "skipping non-raster image");
            continue;
        }
        let mut file = match archive.by_name(&rel.part) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => {
                tracing::warn!(part = %rel.part, id = %rel.id, "image relationship points at a missing part");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        images.push(EmbeddedImage {
            name: rel.part.clone(),
            bytes,
        });
    }
    Ok(images)
}

fn is_raster(part: &str) -> bool {
    ImageFormat::from_path(part).is_ok()
}
