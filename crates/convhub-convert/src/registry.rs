//! Conversion-type → converter registry.
//!
//! Adding a conversion type is a data addition (identifier, extensions,
//! converter) and never touches the dispatch logic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use convhub_core::config::ConversionConfig;

use crate::converter::Converter;
use crate::converters::{
    ExcelToCsv, FfmpegConverter, ImageToPdf, PdfToWord, UppercaseText, WordToPdf,
};
use crate::error::ConversionError;
use crate::filesystem::FsUtils;
use crate::kind::ConversionKind;
use crate::tools::{self, FFMPEG, ToolInfo};

/// A registered conversion type.
#[derive(Debug, Clone)]
pub struct ConverterEntry {
    /// The conversion type.
    pub kind: ConversionKind,
    /// Accepted input extensions (lowercase, no dot).
    pub accepted_extensions: &'static [&'static str],
    /// Extension of produced files.
    pub output_extension: &'static str,
    /// Suffix appended to the stem of the display name, if any.
    pub output_suffix: Option<&'static str>,
    /// The conversion routine.
    pub converter: Arc<dyn Converter>,
    /// Whether this entry can be requested.
    pub enabled: bool,
}

impl ConverterEntry {
    /// Entry with the kind's default extensions.
    pub fn new(kind: ConversionKind, converter: Arc<dyn Converter>) -> Self {
        Self {
            kind,
            accepted_extensions: kind.accepted_extensions(),
            output_extension: kind.output_extension(),
            output_suffix: match kind {
                ConversionKind::TextUppercase => Some("_uppercase"),
                _ => None,
            },
            converter,
            enabled: true,
        }
    }

    /// Case-insensitive extension check.
    pub fn accepts(&self, file_name: &str) -> bool {
        FsUtils::extension_of(file_name)
            .is_some_and(|ext| self.accepted_extensions.contains(&ext.as_str()))
    }

    /// User-facing name of the output produced from `file_name`.
    pub fn output_name(&self, file_name: &str) -> String {
        let stem = FsUtils::stem_of(file_name);
        format!(
            "{}{}.{}",
            stem,
            self.output_suffix.unwrap_or_default(),
            self.output_extension
        )
    }

    /// Error for a file this entry does not accept.
    pub fn rejection(&self, file_name: &str) -> ConversionError {
        ConversionError::UnsupportedExtension {
            file_name: file_name.to_string(),
            conversion: self.kind.to_string(),
            expected: self.accepted_extensions.join(", "),
        }
    }
}

/// Public description of an entry (upload form, `GET /api/conversions`).
#[derive(Debug, Clone, Serialize)]
pub struct ConversionInfo {
    /// Wire identifier.
    pub id: ConversionKind,
    /// Human-readable label.
    pub label: &'static str,
    /// Accepted input extensions.
    pub accepted_extensions: &'static [&'static str],
    /// Output extension.
    pub output_extension: &'static str,
}

/// Registry of all conversion types.
#[derive(Debug, Clone)]
pub struct ConverterRegistry {
    entries: BTreeMap<ConversionKind, ConverterEntry>,
    ffmpeg: Option<PathBuf>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            ffmpeg: None,
        }
    }

    /// Register every built-in conversion type, resolving ffmpeg and
    /// applying `disabled_types` from `config`.
    pub fn with_defaults(config: &ConversionConfig) -> Self {
        let ffmpeg = tools::locate(FFMPEG, config.ffmpeg_path.as_deref());
        let mut registry = Self::with_tools(ffmpeg, config.timeout_seconds);

        for identifier in &config.disabled_types {
            match identifier.parse::<ConversionKind>() {
                Ok(kind) => {
                    registry.set_enabled(kind, false);
                    tracing::info!(conversion = %kind, "Conversion type disabled by configuration");
                }
                Err(_) => {
                    tracing::warn!(identifier = %identifier, "Ignoring unknown disabled conversion type");
                }
            }
        }

        registry
    }

    /// Register every built-in conversion type with an already resolved
    /// ffmpeg location.
    pub fn with_tools(ffmpeg: Option<PathBuf>, timeout_seconds: u64) -> Self {
        let mut registry = Self::new();

        registry.register(ConverterEntry::new(
            ConversionKind::TextUppercase,
            Arc::new(UppercaseText),
        ));
        registry.register(ConverterEntry::new(
            ConversionKind::PdfToWord,
            Arc::new(PdfToWord),
        ));
        registry.register(ConverterEntry::new(
            ConversionKind::ImageToPdf,
            Arc::new(ImageToPdf),
        ));
        registry.register(ConverterEntry::new(
            ConversionKind::WordToPdf,
            Arc::new(WordToPdf),
        ));
        registry.register(ConverterEntry::new(
            ConversionKind::ExcelToCsv,
            Arc::new(ExcelToCsv),
        ));

        for kind in ConversionKind::ALL {
            if let Some(converter) = FfmpegConverter::for_kind(kind, ffmpeg.clone(), timeout_seconds)
            {
                registry.register(ConverterEntry::new(kind, Arc::new(converter)));
            }
        }

        registry.ffmpeg = ffmpeg;
        registry
    }

    /// Look up an enabled entry.
    pub fn lookup(&self, kind: ConversionKind) -> Result<&ConverterEntry, ConversionError> {
        self.entries
            .get(&kind)
            .filter(|e| e.enabled)
            .ok_or_else(|| ConversionError::UnknownConversion {
                identifier: kind.to_string(),
            })
    }

    /// Parse an identifier and look it up.
    pub fn resolve(&self, identifier: &str) -> Result<&ConverterEntry, ConversionError> {
        self.lookup(identifier.parse()?)
    }

    /// Enabled entries in identifier order.
    pub fn entries(&self) -> impl Iterator<Item = &ConverterEntry> {
        self.entries.values().filter(|e| e.enabled)
    }

    /// Public descriptions of the enabled entries.
    pub fn describe(&self) -> Vec<ConversionInfo> {
        self.entries()
            .map(|e| ConversionInfo {
                id: e.kind,
                label: e.kind.label(),
                accepted_extensions: e.accepted_extensions,
                output_extension: e.output_extension,
            })
            .collect()
    }

    /// Register (or replace) an entry.
    pub fn register(&mut self, entry: ConverterEntry) {
        self.entries.insert(entry.kind, entry);
    }

    /// Enable or disable an entry. Returns `false` if it is not registered.
    pub fn set_enabled(&mut self, kind: ConversionKind, enabled: bool) -> bool {
        match self.entries.get_mut(&kind) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Resolved ffmpeg location.
    pub fn ffmpeg(&self) -> Option<&Path> {
        self.ffmpeg.as_deref()
    }

    /// External tool availability.
    pub fn tools(&self) -> Vec<ToolInfo> {
        vec![ToolInfo::new(FFMPEG, self.ffmpeg())]
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
