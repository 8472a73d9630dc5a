//! Unified error type for the conversion pipeline.
//!
//! Request validation, converter, process execution, packaging and
//! storage errors are consolidated into a single `ConversionError` enum
//! that maps cleanly to `convhub_core::error::AppError`.

use std::path::PathBuf;

use convhub_core::error::AppError;
use thiserror::Error;

use crate::models::{FailureKind, FileFailure};

/// Unified error type for all conversion operations.
#[derive(Debug, Error)]
pub enum ConversionError {
    // --- Request errors ---
    /// The form carried no `conversion_type` field.
    #[error("conversion_type is required")]
    MissingConversionType,

    /// The form carried no non-empty file parts.
    #[error("no files were uploaded")]
    NoFiles,

    /// The identifier is not registered or has been disabled.
    #[error("unknown conversion type: {identifier}")]
    UnknownConversion {
        /// The identifier the client sent.
        identifier: String,
    },

    /// A file's extension does not match the chosen conversion type.
    #[error("{file_name}: expected one of [{expected}] for {conversion}")]
    UnsupportedExtension {
        /// Client-supplied file name.
        file_name: String,
        /// Conversion identifier.
        conversion: String,
        /// Comma-joined list of accepted extensions.
        expected: String,
    },

    // --- Converter errors ---
    /// The input could not be read by the format collaborator.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The converter failed while producing output.
    #[error("{0}")]
    Converter(String),

    /// A file failed under the abort policy.
    #[error("conversion failed for {file_name}: {message}")]
    ConversionFailed {
        /// Client-supplied file name.
        file_name: String,
        /// Failure description.
        message: String,
    },

    // --- Process execution errors ---
    /// External tool is not installed or not on `PATH`.
    #[error("{tool} executable not found")]
    ToolNotFound {
        /// Tool name.
        tool: String,
    },

    /// External tool exited with a non-zero status.
    #[error("{tool} exited with code {code}: {stderr}")]
    ToolFailed {
        /// Tool name.
        tool: String,
        /// The exit code (-1 when killed by a signal).
        code: i32,
        /// Captured stderr output (truncated).
        stderr: String,
    },

    /// A conversion exceeded the per-file timeout.
    #[error("conversion timed out after {timeout_seconds}s")]
    TimedOut {
        /// The timeout that was exceeded.
        timeout_seconds: u64,
    },

    /// Output file was not created after a successful conversion.
    #[error("output file not created: {path}")]
    OutputNotCreated {
        /// Expected output path.
        path: PathBuf,
    },

    /// Output file is smaller than the configured minimum.
    #[error("output file is empty ({size} bytes): {path}")]
    OutputEmpty {
        /// Path to the undersized output.
        path: PathBuf,
        /// Actual size.
        size: u64,
    },

    // --- Batch errors ---
    /// Every file in the batch failed.
    #[error("no files could be converted: {}", summarize(failures))]
    NoConvertibleOutput {
        /// One entry per input file.
        failures: Vec<FileFailure>,
    },

    /// Building the result archive failed.
    #[error("failed to build archive: {0}")]
    Packaging(String),

    // --- Generic errors ---
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tokio task join error.
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ConversionError {
    /// Whether every failure in a `NoConvertibleOutput` was a rejected
    /// extension, i.e. the client sent nothing this type could accept.
    pub fn all_rejected(&self) -> bool {
        match self {
            Self::NoConvertibleOutput { failures } => {
                !failures.is_empty()
                    && failures
                        .iter()
                        .all(|f| f.kind == FailureKind::UnsupportedExtension)
            }
            _ => false,
        }
    }
}

fn summarize(failures: &[FileFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.source_name, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match &err {
            ConversionError::MissingConversionType
            | ConversionError::NoFiles
            | ConversionError::UnknownConversion { .. }
            | ConversionError::UnsupportedExtension { .. } => AppError::validation(err.to_string()),
            ConversionError::NoConvertibleOutput { .. } if err.all_rejected() => {
                AppError::validation(err.to_string())
            }
            ConversionError::NoConvertibleOutput { .. }
            | ConversionError::ConversionFailed { .. }
            | ConversionError::InvalidInput(_)
            | ConversionError::Converter(_)
            | ConversionError::ToolNotFound { .. }
            | ConversionError::ToolFailed { .. }
            | ConversionError::TimedOut { .. }
            | ConversionError::OutputNotCreated { .. }
            | ConversionError::OutputEmpty { .. } => AppError::conversion(err.to_string()),
            ConversionError::Packaging(_) => AppError::packaging(err.to_string()),
            ConversionError::Io(_) => AppError::storage(err.to_string()),
            ConversionError::Join(_) => AppError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convhub_core::error::ErrorKind;

    fn failure(name: &str, kind: FailureKind) -> FileFailure {
        FileFailure {
            source_name: name.to_string(),
            kind,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_request_errors_are_validation() {
        let err: AppError = ConversionError::MissingConversionType.into();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err: AppError = ConversionError::UnknownConversion {
            identifier: "mp3_to_flac".to_string(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("mp3_to_flac"));
    }

    #[test]
    fn test_all_rejected_batch_is_client_error() {
        let err = ConversionError::NoConvertibleOutput {
            failures: vec![
                failure("a.doc", FailureKind::UnsupportedExtension),
                failure("b.doc", FailureKind::UnsupportedExtension),
            ],
        };
        assert!(err.all_rejected());
        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_mixed_failures_are_conversion_errors() {
        let err = ConversionError::NoConvertibleOutput {
            failures: vec![
                failure("a.doc", FailureKind::UnsupportedExtension),
                failure("b.pdf", FailureKind::ConversionFailed),
            ],
        };
        assert!(!err.all_rejected());
        let message = err.to_string();
        assert!(message.contains("a.doc: boom"));
        assert!(message.contains("b.pdf: boom"));

        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::Conversion);
    }

    #[test]
    fn test_packaging_maps_to_packaging() {
        let app: AppError = ConversionError::Packaging("disk full".to_string()).into();
        assert_eq!(app.kind, ErrorKind::Packaging);
    }
}
