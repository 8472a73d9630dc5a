//! Converter implementations, one per conversion routine.

pub mod docx;
pub mod excel_to_csv;
pub mod image_to_pdf;
pub mod media;
pub mod pdf;
pub mod pdf_to_word;
pub mod text;
pub mod word_to_pdf;

pub use excel_to_csv::ExcelToCsv;
pub use image_to_pdf::ImageToPdf;
pub use media::FfmpegConverter;
pub use pdf_to_word::PdfToWord;
pub use text::UppercaseText;
pub use word_to_pdf::WordToPdf;
