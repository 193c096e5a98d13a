//! WordprocessingML parsing: body paragraphs and image relationships

use crate::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const IMAGE_RELATIONSHIP_SUFFIX: &str = "/image";

/// Text of every paragraph that is a direct child of `w:body`, in document order.
///
/// Paragraphs inside tables, text boxes and other containers are not part of
/// the body flow and are skipped. Inside a run, `w:tab` becomes a tab and
/// `w:br`/`w:cr` become line breaks.
pub fn parse_body_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    // Local names of the open elements
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"p" && parent_is(&stack, b"body") {
                    current = Some(String::new());
                }
                stack.push(name);
            }
            Event::End(_) => {
                let closed = stack.pop();
                if closed.as_deref() == Some(b"p".as_slice()) && parent_is(&stack, b"body") {
                    if let Some(text) = current.take() {
                        paragraphs.push(text);
                    }
                }
            }
            Event::Empty(ref e) => {
                let name = e.local_name();
                if name.as_ref() == b"p" && parent_is(&stack, b"body") {
                    paragraphs.push(String::new());
                } else if let Some(text) = current.as_mut() {
                    if in_body_run(&stack) {
                        match name.as_ref() {
                            b"tab" => text.push('\t'),
                            b"br" | b"cr" => text.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            Event::Text(e) => {
                if let Some(text) = current.as_mut() {
                    if stack.last().map(Vec::as_slice) == Some(b"t".as_slice()) && in_body_text(&stack) {
                        text.push_str(&e.unescape()?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().map(Vec::as_slice) == Some(name)
}

/// The innermost open element is a run of a body paragraph.
fn in_body_run(stack: &[Vec<u8>]) -> bool {
    parent_is(stack, b"r") && !inside_textbox(stack)
}

/// A `w:t` of a body paragraph, directly under a run.
fn in_body_text(stack: &[Vec<u8>]) -> bool {
    let len = stack.len();
    len >= 2 && stack[len - 2] == b"r" && !inside_textbox(stack)
}

fn inside_textbox(stack: &[Vec<u8>]) -> bool {
    stack.iter().any(|n| n == b"txbxContent")
}

/// A relationship from `word/_rels/document.xml.rels` pointing at an image part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRelationship {
    pub id: String,
    /// Part name inside the package, e.g. `word/media/image1.png`
    pub part: String,
}

/// Internal image relationships in the order they appear in the rels file.
pub fn parse_image_relationships(xml: &str) -> Result<Vec<ImageRelationship>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut images = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let Some(rel) = image_relationship(e)? {
                    images.push(rel);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(images)
}

fn image_relationship(e: &BytesStart) -> Result<Option<ImageRelationship>> {
    let mut id = None;
    let mut rel_type = None;
    let mut target = None;
    let mut external = false;

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.local_name().as_ref() {
            b"Id" => id = Some(value),
            b"Type" => rel_type = Some(value),
            b"Target" => target = Some(value),
            b"TargetMode" => external = value.eq_ignore_ascii_case("External"),
            _ => {}
        }
    }

    let is_image = rel_type.is_some_and(|t| t.ends_with(IMAGE_RELATIONSHIP_SUFFIX));
    match (id, target) {
        (Some(id), Some(target)) if is_image && !external => Ok(Some(ImageRelationship {
            id,
            part: resolve_part("word", &target),
        })),
        _ => Ok(None),
    }
}

/// Resolve a relationship target against the directory of the source part.
fn resolve_part(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
