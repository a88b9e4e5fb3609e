//! Export of the last question, its answer, and the retrieved rows.
//!
//! Every writer consumes [`ExportRow::normalize`] output, so all three
//! formats carry the same `(text, source, file, score)` columns:
//!
//! ```text
//! Question | <question>
//! Answer   | <answer>
//!
//! Text | Source | File | Score
//! ...one line per retrieved row...
//! ```
//!
//! The DOCX layout is a document rather than a table: a "RAG Export"
//! heading, the question and answer, then one "Retrieved Chunk" section
//! per row.

use std::borrow::Cow;
use std::io::{Cursor, Write};

use anyhow::{anyhow, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Deserialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use ragdesk_core::models::{ExportRow, NormalizedRow};

pub const MIME_CSV: &str = "text/csv";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Title of the sheet and of the document.
pub const EXPORT_TITLE: &str = "RAG Export";

const HEADER: [&str; 4] = ["Text", "Source", "File", "Score"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[serde(alias = "xlsx")]
    #[value(alias = "xlsx")]
    Excel,
    Docx,
}

impl ExportFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => MIME_CSV,
            ExportFormat::Excel => MIME_XLSX,
            ExportFormat::Docx => MIME_DOCX,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "rag_export.csv",
            ExportFormat::Excel => "rag_export.xlsx",
            ExportFormat::Docx => "rag_export.docx",
        }
    }
}

/// Render `rows` in the requested format.
pub fn export(format: ExportFormat, rows: &[ExportRow], question: &str, answer: &str) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => export_csv(rows, question, answer),
        ExportFormat::Excel => export_xlsx(rows, question, answer),
        ExportFormat::Docx => export_docx(rows, question, answer),
    }
}

fn normalized(rows: &[ExportRow]) -> Vec<NormalizedRow> {
    rows.iter().map(ExportRow::normalize).collect()
}

/// Whether `c` may appear in an XML 1.0 document.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Drop characters XML 1.0 cannot carry, such as the form feeds OCR
/// leaves between pages. Markup escaping is left to the writers.
pub fn sanitize_xml_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| is_xml_char(*c)).collect())
    }
}

// ============ CSV ============

pub fn export_csv(rows: &[ExportRow], question: &str, answer: &str) -> Result<Vec<u8>> {
    let mut head = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    head.write_record(["Question", question])?;
    head.write_record(["Answer", answer])?;
    let mut buf = head
        .into_inner()
        .map_err(|e| anyhow!("CSV write failed: {}", e.error()))?;
    buf.push(b'\n');

    let mut body = csv::Writer::from_writer(buf);
    body.write_record(HEADER)?;
    for row in normalized(rows) {
        body.write_record([&row.text, &row.source, &row.file, &row.score])?;
    }
    body.into_inner()
        .map_err(|e| anyhow!("CSV write failed: {}", e.error()))
}

// ============ XLSX ============

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        EXPORT_TITLE
    )
}

fn column_letter(col: usize) -> char {
    (b'A' + col as u8) as char
}

/// Sheet rows as `(row_number, cells)`; row 3 is left blank.
fn sheet_rows(rows: &[ExportRow], question: &str, answer: &str) -> Vec<(usize, Vec<String>)> {
    let mut out = vec![
        (1, vec!["Question".to_string(), question.to_string()]),
        (2, vec!["Answer".to_string(), answer.to_string()]),
        (4, HEADER.iter().map(|h| h.to_string()).collect()),
    ];
    for (i, row) in normalized(rows).into_iter().enumerate() {
        out.push((5 + i, vec![row.text, row.source, row.file, row.score]));
    }
    out
}

fn worksheet_xml(rows: &[(usize, Vec<String>)]) -> Result<Vec<u8>> {
    let mut w = quick_xml::Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut root = BytesStart::new("worksheet");
    root.push_attribute(("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main"));
    w.write_event(Event::Start(root))?;
    w.write_event(Event::Start(BytesStart::new("sheetData")))?;

    for (row_num, cells) in rows {
        let r = row_num.to_string();
        let mut row = BytesStart::new("row");
        row.push_attribute(("r", r.as_str()));
        w.write_event(Event::Start(row))?;

        for (col, value) in cells.iter().enumerate() {
            let cell_ref = format!("{}{}", column_letter(col), row_num);
            let mut c = BytesStart::new("c");
            c.push_attribute(("r", cell_ref.as_str()));
            c.push_attribute(("t", "inlineStr"));
            w.write_event(Event::Start(c))?;
            w.write_event(Event::Start(BytesStart::new("is")))?;
            let mut t = BytesStart::new("t");
            t.push_attribute(("xml:space", "preserve"));
            w.write_event(Event::Start(t))?;
            w.write_event(Event::Text(BytesText::new(&sanitize_xml_text(value))))?;
            w.write_event(Event::End(BytesEnd::new("t")))?;
            w.write_event(Event::End(BytesEnd::new("is")))?;
            w.write_event(Event::End(BytesEnd::new("c")))?;
        }

        w.write_event(Event::End(BytesEnd::new("row")))?;
    }

    w.write_event(Event::End(BytesEnd::new("sheetData")))?;
    w.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(w.into_inner())
}

pub fn export_xlsx(rows: &[ExportRow], question: &str, answer: &str) -> Result<Vec<u8>> {
    let sheet = worksheet_xml(&sheet_rows(rows, question, answer))?;
    let workbook = workbook_xml();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("xl/workbook.xml", workbook.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes()),
        ("xl/worksheets/sheet1.xml", &sheet),
    ];
    for (name, data) in parts {
        zip.start_file(name, options)?;
        zip.write_all(data)?;
    }

    Ok(zip.finish()?.into_inner())
}

// ============ DOCX ============

fn docx_paragraph(text: &str) -> docx_rs::Paragraph {
    docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(sanitize_xml_text(text)))
}

fn docx_heading(text: &str, style: &str) -> docx_rs::Paragraph {
    docx_paragraph(text).style(style)
}

pub fn export_docx(rows: &[ExportRow], question: &str, answer: &str) -> Result<Vec<u8>> {
    use docx_rs::{Docx, Style, StyleType};

    let mut doc = Docx::new()
        .add_style(
            Style::new("Heading1", StyleType::Paragraph)
                .name("Heading 1")
                .bold()
                .size(32),
        )
        .add_style(
            Style::new("Heading2", StyleType::Paragraph)
                .name("Heading 2")
                .bold()
                .size(26),
        )
        .add_paragraph(docx_heading(EXPORT_TITLE, "Heading1"))
        .add_paragraph(docx_paragraph(&format!("Question: {}", question)))
        .add_paragraph(docx_paragraph(&format!("Answer: {}", answer)));

    for row in normalized(rows) {
        doc = doc
            .add_paragraph(docx_heading("Retrieved Chunk", "Heading2"))
            .add_paragraph(docx_paragraph(&row.text))
            .add_paragraph(docx_paragraph(&format!("Source: {}", row.source)))
            .add_paragraph(docx_paragraph(&format!("File: {}", row.file)))
            .add_paragraph(docx_paragraph(&format!("Score: {}", row.score)));
    }

    let mut buf = Cursor::new(Vec::new());
    doc.build()
        .pack(&mut buf)
        .map_err(|e| anyhow!("DOCX write failed: {}", e))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_core::models::RowMetadata;
    use std::io::Read;

    fn mixed_rows() -> Vec<ExportRow> {
        vec![
            ExportRow::text("plain chunk"),
            ExportRow::WithMetadata {
                text: "chunk with metadata".to_string(),
                metadata: RowMetadata {
                    source: Some("notes.txt".to_string()),
                    file: None,
                    score: Some(0.125),
                },
            },
            ExportRow::Record {
                text: "record chunk".to_string(),
                source: None,
                file: Some("report.pdf".to_string()),
                score: None,
                metadata: RowMetadata::default(),
            },
        ]
    }

    #[test]
    fn test_csv_layout() {
        let bytes = export_csv(&mixed_rows(), "Q?", "A, with comma").unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());
        let records: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();

        // the csv reader skips the blank separator line
        assert_eq!(records[0], vec!["Question", "Q?"]);
        assert_eq!(records[1], vec!["Answer", "A, with comma"]);
        assert_eq!(records[2], vec!["Text", "Source", "File", "Score"]);
        assert_eq!(records.len(), 6);
        assert_eq!(records[3], vec!["plain chunk", "Unknown", "Unknown", "N/A"]);
        assert_eq!(
            records[4],
            vec!["chunk with metadata", "notes.txt", "notes.txt", "0.1250"]
        );
        assert_eq!(records[5], vec!["record chunk", "Unknown", "report.pdf", "N/A"]);

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\n\nText,Source,File,Score\n"));
    }

    fn read_zip_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_xlsx_layout() {
        let bytes = export_xlsx(&mixed_rows(), "Q & A?", "answer").unwrap();
        let workbook = read_zip_entry(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="RAG Export""#));

        let sheet = read_zip_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert_eq!(sheet.matches("<row ").count(), 6);
        assert!(sheet.contains("Q &amp; A?"));
        assert!(sheet.contains(r#"<c r="A4" t="inlineStr">"#));
        assert!(sheet.contains(">report.pdf<"));
        assert_eq!(sheet.matches(">N/A<").count(), 2);
    }

    #[test]
    fn test_docx_layout() {
        let bytes = export_docx(&mixed_rows(), "Where?", "There.").unwrap();
        let text = crate::extract::extract_docx(&bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "RAG Export");
        assert_eq!(lines[1], "Question: Where?");
        assert_eq!(lines[2], "Answer: There.");
        assert_eq!(text.matches("Retrieved Chunk").count(), 3);
        assert!(lines.contains(&"Source: notes.txt"));
        assert!(lines.contains(&"File: report.pdf"));
        assert_eq!(lines.iter().filter(|l| **l == "Score: N/A").count(), 2);
    }

    /// Reads `xml` to the end and returns its text content, failing on
    /// malformed markup or on characters XML 1.0 forbids.
    fn parse_strict(xml: &str) -> String {
        if let Some((pos, c)) = xml.char_indices().find(|(_, c)| !is_xml_char(*c)) {
            panic!("non-XML character {:?} at byte {}", c, pos);
        }
        let mut reader = quick_xml::Reader::from_str(xml);
        let mut text = String::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Text(t) => text.push_str(&t.unescape().unwrap()),
                Event::Eof => break,
                _ => {}
            }
        }
        text
    }

    #[test]
    fn test_sanitize_xml_text() {
        assert!(matches!(sanitize_xml_text("tab\tok\n"), Cow::Borrowed(_)));
        assert_eq!(sanitize_xml_text("page one\u{c}\npage two\u{0}"), "page one\npage two");
        assert_eq!(sanitize_xml_text("caf\u{e9} \u{1F600}"), "caf\u{e9} \u{1F600}");
    }

    #[test]
    fn test_control_characters_do_not_corrupt_xml() {
        let rows = vec![ExportRow::text("page one\u{c}\npage two")];

        let xlsx = export_xlsx(&rows, "q\u{1}", "a").unwrap();
        let sheet = parse_strict(&read_zip_entry(&xlsx, "xl/worksheets/sheet1.xml"));
        assert!(sheet.contains("page one\npage two"));

        let docx = export_docx(&rows, "q\u{1}", "a").unwrap();
        let body = parse_strict(&read_zip_entry(&docx, "word/document.xml"));
        assert!(body.contains("page one"));
        assert!(body.contains("Question: q"));
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::Excel.file_name(), "rag_export.xlsx");
        assert_eq!(ExportFormat::Docx.mime_type(), MIME_DOCX);
        let parsed: ExportFormat = serde_json::from_str("\"xlsx\"").unwrap();
        assert_eq!(parsed, ExportFormat::Excel);
    }
}
