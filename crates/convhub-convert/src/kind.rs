//! Conversion-type identifiers and their file-format contracts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// Supported conversion types. The snake_case identifiers are an external
/// contract and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionKind {
    /// Plain text to upper case
    TextUppercase,
    /// PDF to Word (docx)
    PdfToWord,
    /// Raster image to PDF
    ImageToPdf,
    /// Word (docx) to PDF
    WordToPdf,
    /// First worksheet of a spreadsheet to CSV
    ExcelToCsv,
    /// MP3 audio to WAV
    Mp3ToWav,
    /// WAV audio to MP3
    WavToMp3,
    /// MP4 video to AVI
    Mp4ToAvi,
    /// AVI video to MP4
    AviToMp4,
    /// Audio track of an MP4 video to MP3
    Mp4ToMp3,
}

impl ConversionKind {
    /// Every conversion type, in identifier order.
    pub const ALL: [ConversionKind; 10] = [
        Self::TextUppercase,
        Self::PdfToWord,
        Self::ImageToPdf,
        Self::WordToPdf,
        Self::ExcelToCsv,
        Self::Mp3ToWav,
        Self::WavToMp3,
        Self::Mp4ToAvi,
        Self::AviToMp4,
        Self::Mp4ToMp3,
    ];

    /// The stable wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextUppercase => "text_uppercase",
            Self::PdfToWord => "pdf_to_word",
            Self::ImageToPdf => "image_to_pdf",
            Self::WordToPdf => "word_to_pdf",
            Self::ExcelToCsv => "excel_to_csv",
            Self::Mp3ToWav => "mp3_to_wav",
            Self::WavToMp3 => "wav_to_mp3",
            Self::Mp4ToAvi => "mp4_to_avi",
            Self::AviToMp4 => "avi_to_mp4",
            Self::Mp4ToMp3 => "mp4_to_mp3",
        }
    }

    /// Human-readable label for the upload form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TextUppercase => "Text to UPPERCASE",
            Self::PdfToWord => "PDF to Word",
            Self::ImageToPdf => "Image to PDF",
            Self::WordToPdf => "Word to PDF",
            Self::ExcelToCsv => "Excel to CSV",
            Self::Mp3ToWav => "MP3 to WAV",
            Self::WavToMp3 => "WAV to MP3",
            Self::Mp4ToAvi => "MP4 to AVI",
            Self::AviToMp4 => "AVI to MP4",
            Self::Mp4ToMp3 => "MP4 to MP3 (audio track)",
        }
    }

    /// Input extensions accepted by this conversion (lowercase, no dot).
    pub fn accepted_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::TextUppercase => &["txt"],
            Self::PdfToWord => &["pdf"],
            Self::ImageToPdf => &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tif", "tiff"],
            Self::WordToPdf => &["docx"],
            Self::ExcelToCsv => &["xlsx", "xlsm", "xls", "ods"],
            Self::Mp3ToWav => &["mp3"],
            Self::WavToMp3 => &["wav"],
            Self::Mp4ToAvi | Self::Mp4ToMp3 => &["mp4"],
            Self::AviToMp4 => &["avi"],
        }
    }

    /// Extension of the produced file.
    pub fn output_extension(&self) -> &'static str {
        match self {
            Self::TextUppercase => "txt",
            Self::PdfToWord => "docx",
            Self::ImageToPdf | Self::WordToPdf => "pdf",
            Self::ExcelToCsv => "csv",
            Self::Mp3ToWav => "wav",
            Self::WavToMp3 | Self::Mp4ToMp3 => "mp3",
            Self::Mp4ToAvi => "avi",
            Self::AviToMp4 => "mp4",
        }
    }

    /// Whether the conversion shells out to ffmpeg.
    pub fn requires_ffmpeg(&self) -> bool {
        matches!(
            self,
            Self::Mp3ToWav | Self::WavToMp3 | Self::Mp4ToAvi | Self::AviToMp4 | Self::Mp4ToMp3
        )
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConversionError::UnknownConversion {
                identifier: s.to_string(),
            })
    }
}

/// MIME type for an output extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "zip" => "application/zip",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_round_trip() {
        for kind in ConversionKind::ALL {
            let parsed: ConversionKind = kind.as_str().parse().expect("parse");
            assert_eq!(parsed, kind);
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_unknown_identifier() {
        let err = "TEXT_UPPERCASE".parse::<ConversionKind>().expect_err("case-sensitive");
        assert!(matches!(err, ConversionError::UnknownConversion { identifier } if identifier == "TEXT_UPPERCASE"));
    }

    #[test]
    fn test_media_kinds_need_ffmpeg() {
        let media: Vec<_> = ConversionKind::ALL
            .into_iter()
            .filter(ConversionKind::requires_ffmpeg)
            .collect();
        assert_eq!(media.len(), 5);
        assert!(!ConversionKind::ExcelToCsv.requires_ffmpeg());
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_for_extension("PDF"), "application/pdf");
        assert_eq!(mime_for_extension("zip"), "application/zip");
        assert_eq!(mime_for_extension("xyz"), "application/octet-stream");
    }
}
