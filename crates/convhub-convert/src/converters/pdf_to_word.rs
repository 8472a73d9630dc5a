//! `pdf_to_word`: text extraction from a PDF into a docx document.
//!
//! Layout, images and fonts are not carried over; each extracted line
//! becomes a paragraph and pages are separated by page breaks.

use std::path::Path;

use async_trait::async_trait;

use crate::converter::{Converter, run_blocking};
use crate::converters::docx::{self, Block};
use crate::converters::pdf;
use crate::error::ConversionError;

/// PDF → docx converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfToWord;

impl PdfToWord {
    fn convert_file(input: &Path, output: &Path) -> Result<(), ConversionError> {
        let pages = pdf::extract_pages(input)?;

        let mut blocks = Vec::new();
        for (index, text) in pages.iter().enumerate() {
            if index > 0 {
                blocks.push(Block::PageBreak);
            }
            blocks.extend(
                text.lines()
                    .map(|line| Block::Paragraph(line.trim_end().to_string())),
            );
        }

        docx::write_document(output, &blocks)
    }
}

#[async_trait]
impl Converter for PdfToWord {
    fn name(&self) -> &'static str {
        "pdf-to-word"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        run_blocking(input, output, Self::convert_file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pdf_text_lands_in_docx() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("report.pdf");
        let output = dir.path().join("report.docx");
        pdf::write_text_pdf(&input, &["Quarterly report".to_string(), "Revenue up".to_string()])
            .expect("fixture");

        PdfToWord.convert(&input, &output).await.expect("convert");

        let paragraphs = docx::read_paragraphs(&output).expect("read docx");
        assert!(paragraphs.iter().any(|p| p.contains("Quarterly report")));
        assert!(paragraphs.iter().any(|p| p.contains("Revenue up")));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("broken.pdf");
        tokio::fs::write(&input, b"%PDF-1.4 garbage").await.expect("write");

        let err = PdfToWord
            .convert(&input, &dir.path().join("broken.docx"))
            .await
            .expect_err("corrupt");
        assert!(matches!(err, ConversionError::InvalidInput(_)));
    }
}
