//! Data models for batch conversion requests and their results.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConversionError;
use crate::filesystem::{BatchWorkspace, WorkspaceGuard};
use crate::kind::ConversionKind;

/// One uploaded file blob.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name.
    pub name: String,
    /// Raw file content.
    pub data: Bytes,
}

impl UploadedFile {
    /// Create a new upload.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// A validated conversion request: one conversion type applied to an
/// ordered, non-empty list of files.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// The selected conversion type.
    pub kind: ConversionKind,
    /// Uploaded files, in form order.
    pub files: Vec<UploadedFile>,
}

impl ConversionRequest {
    /// Build a request from raw form values.
    ///
    /// A missing or blank `conversion_type` and an unknown identifier are
    /// rejected before the file list is checked.
    pub fn parse(
        conversion_type: Option<&str>,
        files: Vec<UploadedFile>,
    ) -> Result<Self, ConversionError> {
        let identifier = conversion_type
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConversionError::MissingConversionType)?;

        let kind: ConversionKind = identifier.parse()?;

        if files.is_empty() {
            return Err(ConversionError::NoFiles);
        }

        Ok(Self { kind, files })
    }
}

/// Why a single file produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The extension is not accepted by the conversion type.
    UnsupportedExtension,
    /// The converter reported an error.
    ConversionFailed,
    /// The converter exceeded the per-file timeout.
    TimedOut,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedExtension => write!(f, "unsupported_extension"),
            Self::ConversionFailed => write!(f, "conversion_failed"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// A successfully produced output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedFile {
    /// Client-supplied name of the input.
    pub source_name: String,
    /// User-facing name of the output (attachment / archive entry name).
    pub display_name: String,
    /// On-disk location of the output.
    pub path: PathBuf,
    /// Output size in bytes.
    pub size: u64,
}

/// A per-file failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// Client-supplied name of the input.
    pub source_name: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub message: String,
}

/// Outcome of converting one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionResult {
    /// The file was converted.
    Converted(ConvertedFile),
    /// The file could not be converted.
    Failed(FileFailure),
}

impl ConversionResult {
    /// Client-supplied name of the input this result belongs to.
    pub fn source_name(&self) -> &str {
        match self {
            Self::Converted(file) => &file.source_name,
            Self::Failed(failure) => &failure.source_name,
        }
    }

    /// Whether the file was converted.
    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted(_))
    }
}

/// The results of one request together with its working directories.
#[derive(Debug)]
pub struct Batch {
    /// Batch identifier (UUIDv7), also the name of the working directories.
    pub id: Uuid,
    /// Conversion type applied to every file.
    pub kind: ConversionKind,
    /// One result per input file, in input order.
    pub results: Vec<ConversionResult>,
    /// Request-scoped upload and output directories.
    pub workspace: BatchWorkspace,
    /// Removes `workspace` if the batch is dropped without being released.
    /// `None` when files are retained.
    pub(crate) cleanup: Option<WorkspaceGuard>,
}

impl Batch {
    /// Successfully converted files, in input order.
    pub fn converted(&self) -> impl Iterator<Item = &ConvertedFile> {
        self.results.iter().filter_map(|r| match r {
            ConversionResult::Converted(file) => Some(file),
            ConversionResult::Failed(_) => None,
        })
    }

    /// Failed files, in input order.
    pub fn failures(&self) -> impl Iterator<Item = &FileFailure> {
        self.results.iter().filter_map(|r| match r {
            ConversionResult::Failed(failure) => Some(failure),
            ConversionResult::Converted(_) => None,
        })
    }

    /// Number of converted files.
    pub fn converted_count(&self) -> usize {
        self.converted().count()
    }

    /// Number of failed files.
    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}
