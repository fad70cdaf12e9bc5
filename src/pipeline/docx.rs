//! Minimal WordprocessingML (`.docx`) codec.
//!
//! A `.docx` file is a zip package. Reading locates the main document part
//! through the package relationships and collects the text of every
//! body-level paragraph. Writing produces the smallest package Word opens
//! without complaint: content types, relationships, a style sheet with
//! `Normal` and `Title`, and the document part.
//!
//! Paragraph text follows what Word shows as the paragraph's own text:
//! `w:t` runs directly in the paragraph (or inside hyperlinks, insertions,
//! smart tags and simple fields), `w:tab` as `\t`, line breaks as `\n`.
//! Table cells, text boxes, deleted text and field instructions are not
//! part of a body paragraph and are skipped.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read, Seek, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DEFAULT_MAIN_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Containers a run may sit in and still belong to the paragraph's text.
const RUN_CONTAINERS: &[&[u8]] = &[b"hyperlink", b"ins", b"smartTag", b"fldSimple", b"customXml"];

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("not a valid docx package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A paragraph to write: optional style id plus its text.
#[derive(Debug, Clone, Copy)]
pub struct Paragraph<'a> {
    pub style: Option<&'a str>,
    pub text: &'a str,
}

// ── Reading ──────────────────────────────────────────────────────────────

/// Read the text of every body-level paragraph, in document order.
pub fn read_paragraphs<R: Read + Seek>(reader: R) -> Result<Vec<String>, DocxError> {
    let mut archive = ZipArchive::new(reader)?;
    let main_part = main_document_part(&mut archive)?;

    let mut xml = Vec::new();
    archive.by_name(&main_part)?.read_to_end(&mut xml)?;
    paragraphs_from_xml(&xml)
}

/// Resolve the main document part from `_rels/.rels`, falling back to the
/// conventional location when the relationship part is missing.
fn main_document_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, DocxError> {
    let mut rels = Vec::new();
    match archive.by_name("_rels/.rels") {
        Ok(mut part) => {
            part.read_to_end(&mut rels)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Ok(DEFAULT_MAIN_PART.to_string()),
        Err(e) => return Err(e.into()),
    }

    let mut reader = Reader::from_reader(rels.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let rel_type = e.try_get_attribute("Type")?;
                let target = e.try_get_attribute("Target")?;
                if let (Some(rel_type), Some(target)) = (rel_type, target) {
                    if rel_type.value.as_ref() == OFFICE_DOCUMENT_REL.as_bytes() {
                        let target = target.unescape_value()?;
                        return Ok(target.trim_start_matches('/').to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(DEFAULT_MAIN_PART.to_string())
}

/// Walk `word/document.xml` collecting body paragraph text.
fn paragraphs_from_xml(xml: &[u8]) -> Result<Vec<String>, DocxError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    // (stack depth of the open body paragraph, its text so far)
    let mut current: Option<(usize, String)> = None;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"p" if current.is_none() && parent_is(&stack, b"body") => {
                        current = Some((stack.len(), String::new()));
                    }
                    b"t" => {
                        if let Some((depth, _)) = current {
                            in_text = in_paragraph_run(&stack, depth);
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" if current.is_none() && parent_is(&stack, b"body") => {
                    paragraphs.push(String::new());
                }
                b"tab" | b"br" | b"cr" => {
                    if let Some((depth, ref mut text)) = current {
                        if in_paragraph_run(&stack, depth) {
                            if let Some(ch) = run_control_char(&e)? {
                                text.push(ch);
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some((_, ref mut text)) = current {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) if in_text => {
                if let Some((_, ref mut text)) = current {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" => {
                        if matches!(current, Some((depth, _)) if depth == stack.len()) {
                            if let Some((_, text)) = current.take() {
                                paragraphs.push(text);
                            }
                        }
                    }
                    _ => {}
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
    stack.last().map(|n| n.as_slice()) == Some(name)
}

/// `true` when the innermost open element is a run belonging directly to the
/// paragraph opened at `depth` (possibly through a transparent container).
fn in_paragraph_run(stack: &[Vec<u8>], depth: usize) -> bool {
    match stack.split_last() {
        Some((last, rest)) if last.as_slice() == b"r" && rest.len() > depth => rest[depth + 1..]
            .iter()
            .all(|n| RUN_CONTAINERS.contains(&n.as_slice())),
        _ => false,
    }
}

/// Character produced by an empty run-level control element.
fn run_control_char(e: &BytesStart<'_>) -> Result<Option<char>, DocxError> {
    match e.local_name().as_ref() {
        b"tab" => Ok(Some('\t')),
        b"cr" => Ok(Some('\n')),
        b"br" => {
            // Page and column breaks carry no text.
            for attr in e.attributes() {
                let attr = attr?;
                if attr.key.local_name().as_ref() == b"type"
                    && matches!(attr.value.as_ref(), b"page" | b"column")
                {
                    return Ok(None);
                }
            }
            Ok(Some('\n'))
        }
        _ => Ok(None),
    }
}

// ── Writing ──────────────────────────────────────────────────────────────

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:after="300"/></w:pPr><w:rPr><w:sz w:val="56"/><w:szCs w:val="56"/></w:rPr></w:style></w:styles>"#;

const DOCUMENT_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

// A4 with 1" margins.
const DOCUMENT_TAIL: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

/// Build a complete `.docx` package holding `paragraphs`.
///
/// Text must already be free of characters XML 1.0 forbids; `\n` becomes a
/// line break and `\t` a tab inside the paragraph.
pub fn build_package(paragraphs: &[Paragraph<'_>]) -> Result<Vec<u8>, DocxError> {
    let mut document = String::from(DOCUMENT_HEAD);
    for p in paragraphs {
        document.push_str(&paragraph_xml(p));
    }
    document.push_str(DOCUMENT_TAIL);

    pack(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/document.xml", document.as_bytes()),
    ])
}

fn pack(parts: &[(&str, &[u8])]) -> Result<Vec<u8>, DocxError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in parts {
        zip.start_file(*name, options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn paragraph_xml(p: &Paragraph<'_>) -> String {
    let mut xml = String::from("<w:p>");
    if let Some(style) = p.style {
        xml.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, escape(style)));
    }
    if !p.text.is_empty() {
        xml.push_str("<w:r>");
        for (i, line) in p.text.split('\n').enumerate() {
            if i > 0 {
                xml.push_str("<w:br/>");
            }
            for (j, segment) in line.split('\t').enumerate() {
                if j > 0 {
                    xml.push_str("<w:tab/>");
                }
                if !segment.is_empty() {
                    xml.push_str(r#"<w:t xml:space="preserve">"#);
                    xml.push_str(&escape(segment));
                    xml.push_str("</w:t>");
                }
            }
        }
        xml.push_str("</w:r>");
    }
    xml.push_str("</w:p>");
    xml
}
