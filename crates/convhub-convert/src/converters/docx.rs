//! Reading and writing the body text of Word (docx) documents.
//!
//! A docx file is a zip package; the body lives in `word/document.xml`.
//! Reading keeps paragraph boundaries plus tabs and line breaks inside
//! runs. Writing produces the smallest package Word accepts: content
//! types, package relationships and the document part.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::ConversionError;

const DOCUMENT_PART: &str = "word/document.xml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// A block of body content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A paragraph of plain text.
    Paragraph(String),
    /// A hard page break.
    PageBreak,
}

/// Read the paragraphs of a docx body, in document order.
pub fn read_paragraphs(path: &Path) -> Result<Vec<String>, ConversionError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ConversionError::InvalidInput(format!("not a docx package: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ConversionError::InvalidInput(format!("missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ConversionError::InvalidInput(format!("unreadable {DOCUMENT_PART}: {e}")))?;

    parse_document_xml(&xml)
}

/// Extract paragraph text from a WordprocessingML document part.
pub(crate) fn parse_document_xml(xml: &str) -> Result<Vec<String>, ConversionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ConversionError::InvalidInput(format!("malformed document XML: {e}")))?;

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if in_run => current.push('\t'),
                b"br" | b"cr" if in_run => current.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text && in_paragraph => {
                let text = t
                    .unescape()
                    .map_err(|e| ConversionError::InvalidInput(format!("bad text node: {e}")))?;
                current.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    paragraphs.push(std::mem::take(&mut current));
                    in_paragraph = false;
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Write `blocks` as a minimal docx package.
pub fn write_document(path: &Path, blocks: &[Block]) -> Result<(), ConversionError> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        (DOCUMENT_PART, document_xml(blocks)),
    ];

    for (name, body) in parts {
        zip.start_file(name, part_options())
            .map_err(|e| ConversionError::Converter(format!("failed to write docx: {e}")))?;
        zip.write_all(body.as_bytes())?;
    }

    zip.finish()
        .map_err(|e| ConversionError::Converter(format!("failed to write docx: {e}")))?;
    Ok(())
}

fn part_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn document_xml(blocks: &[Block]) -> String {
    let mut body = String::new();
    for block in blocks {
        match block {
            Block::Paragraph(text) if text.is_empty() => body.push_str("<w:p/>"),
            Block::Paragraph(text) => {
                body.push_str("<w:p><w:r><w:t xml:space=\"preserve\">");
                body.push_str(&escape_xml(text));
                body.push_str("</w:t></w:r></w:p>");
            }
            Block::PageBreak => body.push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>"),
        }
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}</w:body></w:document>"
        ),
        body
    )
}

/// Escape text for an XML text node. Control characters other than tab,
/// newline and carriage return are not allowed in XML 1.0 and are dropped.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paragraphs_tabs_and_breaks() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> World &amp; co</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>
</w:body>
</w:document>"#;

        let paragraphs = parse_document_xml(xml).expect("parse");
        assert_eq!(
            paragraphs,
            vec![
                "Hello\t World & co".to_string(),
                String::new(),
                "line one\nline two".to_string(),
            ]
        );
    }

    #[test]
    fn test_written_document_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.docx");
        write_document(
            &path,
            &[
                Block::Paragraph("Fish & <Chips>".to_string()),
                Block::PageBreak,
                Block::Paragraph(String::new()),
                Block::Paragraph("Page two".to_string()),
            ],
        )
        .expect("write");

        let paragraphs = read_paragraphs(&path).expect("read");
        assert_eq!(paragraphs[0], "Fish & <Chips>");
        assert!(paragraphs.contains(&"Page two".to_string()));
    }

    #[test]
    fn test_non_zip_is_invalid_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, b"plain text pretending").expect("write");
        assert!(matches!(
            read_paragraphs(&path),
            Err(ConversionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_escape_xml_drops_control_chars() {
        assert_eq!(escape_xml("a\u{0007}b<"), "ab&lt;");
    }
}
