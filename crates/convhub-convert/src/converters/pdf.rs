//! Minimal PDF writing and text extraction on top of `lopdf`.
//!
//! Text documents are laid out on A4 pages with the standard Helvetica
//! font (WinAnsi encoding), one line per text object so extraction yields
//! the same line structure back. Images become a single page sized to the
//! image (1 px = 1 pt).

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::error::ConversionError;

/// A4 width in points.
pub const PAGE_WIDTH: i64 = 595;
/// A4 height in points.
pub const PAGE_HEIGHT: i64 = 842;

const MARGIN: i64 = 56;
const FONT_SIZE: i64 = 11;
const LEADING: i64 = 14;
const LINE_CHARS: usize = 88;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// Write `paragraphs` as a paginated text PDF.
pub fn write_text_pdf(path: &Path, paragraphs: &[String]) -> Result<(), ConversionError> {
    let lines: Vec<String> = paragraphs
        .iter()
        .flat_map(|p| wrap_text(p, LINE_CHARS))
        .collect();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut chunks: Vec<&[String]> = lines.chunks(LINES_PER_PAGE).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }

    let top = PAGE_HEIGHT - MARGIN - FONT_SIZE;
    let mut kids = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let mut operations = Vec::new();
        for (row, line) in chunk.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let y = top - row as i64 * LEADING;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
            operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(encode_win_ansi(line))],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content_id = add_content(&mut doc, operations)?;
        let page_id = add_page(
            &mut doc,
            pages_id,
            content_id,
            resources_id,
            PAGE_WIDTH,
            PAGE_HEIGHT,
        );
        kids.push(page_id.into());
    }

    finish(doc, pages_id, kids, path)
}

/// Write a single-page PDF showing an 8-bit RGB raster.
pub fn write_image_pdf(
    path: &Path,
    width: u32,
    height: u32,
    rgb: Vec<u8>,
) -> Result<(), ConversionError> {
    let (w, h) = (i64::from(width), i64::from(height));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w,
            "Height" => h,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb,
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im1" => image_id },
    });

    let operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()],
        ),
        Operation::new("Do", vec!["Im1".into()]),
        Operation::new("Q", vec![]),
    ];
    let content_id = add_content(&mut doc, operations)?;
    let page_id = add_page(&mut doc, pages_id, content_id, resources_id, w, h);

    finish(doc, pages_id, vec![page_id.into()], path)
}

/// Extract text per page, in page order.
pub fn extract_pages(path: &Path) -> Result<Vec<String>, ConversionError> {
    let doc = Document::load(path)
        .map_err(|e| ConversionError::InvalidInput(format!("unreadable PDF: {e}")))?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ConversionError::InvalidInput("PDF has no pages".to_string()));
    }

    let mut texts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                tracing::warn!(page = page_number, error = %e, "No extractable text on page");
                texts.push(String::new());
            }
        }
    }
    Ok(texts)
}

fn add_content(doc: &mut Document, operations: Vec<Operation>) -> Result<ObjectId, ConversionError> {
    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| ConversionError::Converter(format!("failed to encode page content: {e}")))?;
    Ok(doc.add_object(Stream::new(dictionary! {}, encoded)))
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    content_id: ObjectId,
    resources_id: ObjectId,
    width: i64,
    height: i64,
) -> ObjectId {
    let media_box: Vec<Object> = vec![0.into(), 0.into(), width.into(), height.into()];
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => media_box,
        "Contents" => content_id,
        "Resources" => resources_id,
    })
}

fn finish(
    mut doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    path: &Path,
) -> Result<(), ConversionError> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path)
        .map_err(|e| ConversionError::Converter(format!("failed to write PDF: {e}")))?;
    Ok(())
}

/// Greedy word wrap. Embedded newlines start new lines, tabs expand to
/// four spaces and words longer than `width` are hard-split.
pub(crate) fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for raw in text.split('\n') {
        let raw = raw.replace('\t', "    ");
        let mut line = String::new();
        let mut len = 0usize;

        for word in raw.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > width {
                if len > 0 {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = chars.split_off(width);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }

            if len > 0 && len + 1 + chars.len() > width {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            len += chars.len();
            line.extend(chars);
        }

        lines.push(line);
    }

    lines
}

/// Map text onto WinAnsi (CP1252) bytes; unmappable characters become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
