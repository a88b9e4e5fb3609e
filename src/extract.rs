//! Plain-text extraction for the formats ragdesk ingests.
//!
//! | Format | Approach |
//! |--------|----------|
//! | Text | UTF-8, falling back to Latin-1 for invalid input |
//! | DOCX | `word/document.xml` paragraphs (`w:p`) joined by `\n` |
//! | PDF | per-page text via lopdf; unreadable pages are skipped |
//! | HTML | visible text nodes joined by `\n`; `<script>`/`<style>` dropped |
//!
//! Nothing here panics on malformed input; callers get an [`ExtractError`].

use std::io::Read;

use quick_xml::events::Event;
use thiserror::Error;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Decode bytes as UTF-8, or as Latin-1 if they are not valid UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

// ============ PDF ============

/// Extract PDF text page by page.
///
/// Pages that fail to decode are skipped with a warning. If lopdf cannot
/// parse the file at all, pdf-extract gets a try before giving up.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(error = %e, "lopdf could not parse PDF, trying pdf-extract");
            return pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| ExtractError::Pdf(e.to_string()));
        }
    };

    let mut pages = Vec::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => tracing::warn!(page = page_num, error = %e, "skipping unreadable PDF page"),
        }
    }
    Ok(pages.join("\n"))
}

// ============ DOCX ============

fn read_document_xml(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    Ok(xml)
}

/// Extract DOCX body text, one line per paragraph.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_document_xml(bytes)?;
    paragraphs_from_document_xml(&xml).map(|p| p.join("\n"))
}

fn paragraphs_from_document_xml(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => {
                    if let Ok(Event::Text(te)) = reader.read_event_into(&mut buf) {
                        current.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" => current.push('\t'),
                b"br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"p" {
                    paragraphs.push(std::mem::take(&mut current));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

// ============ HTML ============

/// Visible text of an HTML page: every non-blank text node outside
/// `<script>`/`<style>`, trimmed, one per line.
pub fn extract_html(html: &str) -> String {
    let document = scraper::Html::parse_document(html);

    let mut lines = Vec::new();
    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|el| matches!(el.name(), "script" | "style"))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("café".as_bytes()), "café");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "café" in Latin-1: 0xE9 alone is invalid UTF-8
        assert_eq!(decode_text(&[0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[test]
    fn test_invalid_pdf_returns_error() {
        let err = extract_pdf(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn test_invalid_zip_returns_error_for_docx() {
        let err = extract_docx(b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn test_docx_paragraphs() {
        let xml = br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>paragraph</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>Fish &amp; chips</w:t></w:r></w:p>
</w:body>
</w:document>"#;
        let paragraphs = paragraphs_from_document_xml(xml).unwrap();
        assert_eq!(paragraphs, vec!["First paragraph", "", "Fish & chips"]);
    }

    #[test]
    fn test_html_drops_script_and_style() {
        let html = r#"<html><head><title>Cats</title>
            <style>body { color: red; }</style>
            <script>var secret = 1;</script></head>
            <body><h1>Mats</h1><p>The cat sat on the mat.</p></body></html>"#;
        let text = extract_html(html);
        assert_eq!(text, "Cats\nMats\nThe cat sat on the mat.");
        assert!(!text.contains("secret"));
        assert!(!text.contains("color"));
    }
}
