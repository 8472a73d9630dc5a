//! # ConvHub Convert
//!
//! Conversion engine for ConvHub: the conversion-type registry, the
//! converters behind each type, the batch dispatcher and the output
//! packager.
//!
//! ## Flow
//!
//! A [`ConversionRequest`] is validated against the [`ConverterRegistry`],
//! staged into a per-batch [`BatchWorkspace`] and converted by the
//! [`BatchDispatcher`] according to the configured failure policy. The
//! resulting [`Batch`] is turned into a single download by the
//! [`OutputPackager`].
//!
//! Media conversions shell out to ffmpeg through the
//! [`ConversionExecutor`]; everything else runs in-process.

pub mod converter;
pub mod converters;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod filesystem;
pub mod kind;
pub mod metrics;
pub mod models;
pub mod packager;
pub mod registry;
pub mod tools;

pub use converter::Converter;
pub use dispatcher::{BatchDispatcher, DispatchSettings};
pub use error::ConversionError;
pub use executor::ConversionExecutor;
pub use filesystem::{BatchWorkspace, FsUtils};
pub use kind::ConversionKind;
pub use metrics::{ConversionMetrics, MetricsSnapshot};
pub use models::{
    Batch, ConversionRequest, ConversionResult, ConvertedFile, FailureKind, FileFailure,
    UploadedFile,
};
pub use packager::{ARCHIVE_NAME, FAILURE_MANIFEST, OutputPackager, Package};
pub use registry::{ConversionInfo, ConverterEntry, ConverterRegistry};
pub use tools::ToolInfo;
