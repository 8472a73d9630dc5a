//! `text_uppercase`: Unicode upper-casing of UTF-8 text files.

use std::path::Path;

use async_trait::async_trait;

use crate::converter::{Converter, run_blocking};
use crate::error::ConversionError;

/// Upper-cases the whole content of a UTF-8 text file.
#[derive(Debug, Default, Clone, Copy)]
pub struct UppercaseText;

impl UppercaseText {
    /// The transformation itself. Idempotent.
    pub fn transform(content: &str) -> String {
        content.to_uppercase()
    }

    fn convert_file(input: &Path, output: &Path) -> Result<(), ConversionError> {
        let bytes = std::fs::read(input)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ConversionError::InvalidInput(format!("not valid UTF-8 text: {e}")))?;
        std::fs::write(output, Self::transform(&text))?;
        Ok(())
    }
}

#[async_trait]
impl Converter for UppercaseText {
    fn name(&self) -> &'static str {
        "uppercase-text"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        run_blocking(input, output, Self::convert_file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        assert_eq!(UppercaseText::transform("abc"), "ABC");
        assert_eq!(UppercaseText::transform("straße"), "STRASSE");
        let once = UppercaseText::transform("Mixed Case 123");
        assert_eq!(UppercaseText::transform(&once), once);
    }

    #[tokio::test]
    async fn test_convert_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        tokio::fs::write(&input, "hello\nworld").await.expect("write");

        UppercaseText.convert(&input, &output).await.expect("convert");
        let content = tokio::fs::read_to_string(&output).await.expect("read");
        assert_eq!(content, "HELLO\nWORLD");
    }

    #[tokio::test]
    async fn test_binary_input_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.txt");
        tokio::fs::write(&input, [0xff, 0xfe, 0x00]).await.expect("write");

        let err = UppercaseText
            .convert(&input, &dir.path().join("out.txt"))
            .await
            .expect_err("invalid utf-8");
        assert!(matches!(err, ConversionError::InvalidInput(_)));
    }
}
