//! `word_to_pdf`: docx body text rendered onto PDF pages.

use std::path::Path;

use async_trait::async_trait;

use crate::converter::{Converter, run_blocking};
use crate::converters::{docx, pdf};
use crate::error::ConversionError;

/// docx → PDF converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordToPdf;

impl WordToPdf {
    fn convert_file(input: &Path, output: &Path) -> Result<(), ConversionError> {
        let paragraphs = docx::read_paragraphs(input)?;
        pdf::write_text_pdf(output, &paragraphs)
    }
}

#[async_trait]
impl Converter for WordToPdf {
    fn name(&self) -> &'static str {
        "word-to-pdf"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        run_blocking(input, output, Self::convert_file).await
    }
}
