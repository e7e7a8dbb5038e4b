//! Per-format text extraction.
//!
//! Every extractor is best-effort: it returns trimmed plain text, and an
//! unreadable input collapses to an empty string after the failure is logged.

use crate::error::IngestError;
use crate::pdf::PdfFallbackChain;
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use tracing::warn;

const DOCX_BODY_ENTRY: &str = "word/document.xml";
/// Upper bound on the decompressed `word/document.xml`.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
const SKIPPED_HTML_ELEMENTS: [&str; 2] = ["script", "style"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFamily {
    Pdf,
    Office,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    Plain,
    Html,
}

/// Normalizes `"PDF"`, `".pdf"` and `"pdf"` to `".pdf"`.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    format!(".{trimmed}")
}

pub fn text_format(extension: &str) -> TextFormat {
    match normalize_extension(extension).as_str() {
        ".html" | ".htm" => TextFormat::Html,
        _ => TextFormat::Plain,
    }
}

/// Runs the extractor that matches `family`; never fails past this boundary.
pub fn extract_text(
    bytes: &[u8],
    family: FileFamily,
    extension: &str,
    pdf: &PdfFallbackChain,
) -> String {
    match family {
        FileFamily::Pdf => pdf.extract(bytes),
        FileFamily::Office => extract_docx(bytes).unwrap_or_else(|error| {
            warn!(%error, "docx extraction failed");
            String::new()
        }),
        FileFamily::Text => match text_format(extension) {
            TextFormat::Html => extract_html(bytes),
            TextFormat::Plain => extract_plain_text(bytes),
        },
    }
}

/// Decodes UTF-8, dropping byte sequences that do not decode.
pub fn extract_plain_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text.trim().to_string()
}

/// Visible text of an HTML document, one text block per line.
pub fn extract_html(bytes: &[u8]) -> String {
    let source = extract_plain_text(bytes);
    let document = Html::parse_document(&source);

    let mut blocks = Vec::new();
    collect_visible_text(document.root_element(), &mut blocks);
    blocks.join("\n").trim().to_string()
}

fn collect_visible_text(element: ElementRef<'_>, blocks: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    blocks.push(trimmed.to_string());
                }
            }
            Node::Element(inner) => {
                if SKIPPED_HTML_ELEMENTS.contains(&inner.name()) {
                    continue;
                }
                if let Some(nested) = ElementRef::wrap(child) {
                    collect_visible_text(nested, blocks);
                }
            }
            _ => {}
        }
    }
}

/// Paragraph text of a DOCX body in document order, one paragraph per line.
pub fn extract_docx(bytes: &[u8]) -> Result<String, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| IngestError::Docx(error.to_string()))?;
    let entry = archive
        .by_name(DOCX_BODY_ENTRY)
        .map_err(|error| IngestError::Docx(format!("{DOCX_BODY_ENTRY}: {error}")))?;

    let xml = read_capped(entry, MAX_XML_ENTRY_BYTES)?;
    let paragraphs = docx_paragraphs(&xml)?;
    Ok(paragraphs.join("\n").trim().to_string())
}

/// Reads at most `limit` bytes; anything longer is rejected.
fn read_capped(source: impl Read, limit: u64) -> Result<Vec<u8>, IngestError> {
    let mut bytes = Vec::new();
    source.take(limit + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(IngestError::Docx(format!(
            "{DOCX_BODY_ENTRY} exceeds size limit"
        )));
    }
    Ok(bytes)
}

/// Paragraphs are kept in the order they open; a paragraph nested in a
/// text box gets its own line and never clears the enclosing one.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, IngestError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(element)) => {
                let current = open.last().copied();
                match (element.local_name().as_ref(), current) {
                    (b"p", _) => paragraphs.push(String::new()),
                    (b"tab", Some(slot)) => paragraphs[slot].push('\t'),
                    (b"br", Some(slot)) => paragraphs[slot].push(' '),
                    _ => {}
                }
            }
            Ok(Event::Text(text)) if in_text => {
                if let Some(&slot) = open.last() {
                    let unescaped = text
                        .unescape()
                        .map_err(|error| IngestError::Docx(error.to_string()))?;
                    paragraphs[slot].push_str(&unescaped);
                }
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    open.pop();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => return Err(IngestError::Docx(error.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn docx_bytes(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCX_BODY_ENTRY, zip::write::SimpleFileOptions::default())
            .expect("zip entry should start");
        writer
            .write_all(xml.as_bytes())
            .expect("zip entry should be written");
        writer.finish().expect("zip should finish").into_inner()
    }

    #[test]
    fn extensions_are_normalized() {
        assert_eq!(normalize_extension("PDF"), ".pdf");
        assert_eq!(normalize_extension(".Md"), ".md");
        assert_eq!(text_format("htm"), TextFormat::Html);
        assert_eq!(text_format(".txt"), TextFormat::Plain);
    }

    #[test]
    fn plain_text_drops_invalid_bytes_and_trims() {
        let bytes = b"  caf\xc3\xa9 \xff\xfeok\n\n";
        assert_eq!(extract_plain_text(bytes), "caf\u{e9} ok");
    }

    #[test]
    fn html_skips_script_and_style() {
        let html = br#"<html><head><title>Policy</title><style>p { color: red; }</style></head>
<body><h1>Heading</h1><script>var hidden = 1;</script><p>First <b>bold</b> line.</p></body></html>"#;

        let text = extract_html(html);
        assert_eq!(text, "Policy\nHeading\nFirst\nbold\nline.");
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn docx_paragraphs_are_joined_by_newlines() {
        let bytes = docx_bytes(
            "<w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>paragraph</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>Fish &amp; chips</w:t></w:r></w:p>",
        );

        let text = extract_docx(&bytes).expect("docx should parse");
        assert_eq!(text, "First paragraph\n\nFish & chips");
    }

    #[test]
    fn text_box_paragraph_keeps_enclosing_text() {
        let bytes = docx_bytes(
            "<w:p><w:r><w:t>Outer start </w:t></w:r>\
             <w:r><w:pict><w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent></w:pict></w:r>\
             <w:r><w:t>outer end</w:t></w:r></w:p>",
        );

        let text = extract_docx(&bytes).expect("docx should parse");
        assert_eq!(text, "Outer start outer end\nBoxed");
    }

    #[test]
    fn text_outside_paragraphs_is_ignored() {
        let paragraphs = docx_paragraphs(b"<w:t>stray</w:t><w:p><w:t>kept</w:t></w:p>")
            .expect("xml should parse");
        assert_eq!(paragraphs, vec!["kept".to_string()]);
    }

    #[test]
    fn capped_read_accepts_exact_limit() {
        assert_eq!(read_capped(&b"12345"[..], 5).expect("at limit").len(), 5);
        assert!(matches!(
            read_capped(&b"123456"[..], 5),
            Err(IngestError::Docx(_))
        ));
    }

    #[test]
    fn docx_rejects_non_zip_input() {
        assert!(matches!(
            extract_docx(b"not a zip"),
            Err(IngestError::Docx(_))
        ));
    }

    #[test]
    fn dispatch_collapses_docx_errors_to_empty_text() {
        let text = extract_text(
            b"not a zip",
            FileFamily::Office,
            ".docx",
            &PdfFallbackChain::default(),
        );
        assert!(text.is_empty());
    }
}
