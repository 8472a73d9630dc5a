//! Output packager: a single converted file is returned as-is, anything
//! else becomes one flat ZIP archive.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ConversionError;
use crate::filesystem::FsUtils;
use crate::kind::mime_for_extension;
use crate::metrics::ConversionMetrics;
use crate::models::{Batch, ConvertedFile, FileFailure};

/// File name of the batch archive.
pub const ARCHIVE_NAME: &str = "converted_files.zip";

/// Archive entry listing per-file failures.
pub const FAILURE_MANIFEST: &str = "conversion_errors.txt";

/// Extensions whose content is already compressed.
const STORED_EXTENSIONS: &[&str] = &["mp3", "mp4", "avi", "docx"];

/// A built archive.
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    /// On-disk location.
    pub path: PathBuf,
    /// Number of converted files inside (manifest excluded).
    pub entries: usize,
    /// Number of failed files listed in the manifest.
    pub failures: usize,
}

/// What the client receives.
#[derive(Debug, Clone)]
pub enum Package {
    /// Exactly one file converted and nothing failed.
    Single(ConvertedFile),
    /// Several outputs and/or failures, bundled.
    Archive(ArchiveInfo),
}

impl Package {
    /// On-disk location of the payload.
    pub fn path(&self) -> &Path {
        match self {
            Self::Single(file) => &file.path,
            Self::Archive(archive) => &archive.path,
        }
    }

    /// Attachment file name.
    pub fn download_name(&self) -> &str {
        match self {
            Self::Single(file) => &file.display_name,
            Self::Archive(_) => ARCHIVE_NAME,
        }
    }

    /// Response content type.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Single(file) => {
                mime_for_extension(&FsUtils::extension_of(&file.display_name).unwrap_or_default())
            }
            Self::Archive(_) => mime_for_extension("zip"),
        }
    }
}

/// Turns a finished batch into a [`Package`].
#[derive(Debug, Clone)]
pub struct OutputPackager {
    metrics: Arc<ConversionMetrics>,
}

impl OutputPackager {
    /// Create a packager.
    pub fn new(metrics: Arc<ConversionMetrics>) -> Self {
        Self { metrics }
    }

    /// Package the batch results.
    ///
    /// Fails with `NoConvertibleOutput` when nothing converted; archive
    /// write errors are `Packaging` errors.
    #[instrument(skip_all, fields(batch_id = %batch.id))]
    pub async fn package(&self, batch: &Batch) -> Result<Package, ConversionError> {
        let converted: Vec<&ConvertedFile> = batch.converted().collect();
        let failures: Vec<FileFailure> = batch.failures().cloned().collect();

        if converted.is_empty() {
            return Err(ConversionError::NoConvertibleOutput { failures });
        }

        if let ([single], true) = (converted.as_slice(), failures.is_empty()) {
            return Ok(Package::Single((*single).clone()));
        }

        let entries = archive_entries(&converted);
        let manifest = (!failures.is_empty()).then(|| failure_manifest(&failures));
        let path = batch.workspace.output_dir.join(ARCHIVE_NAME);
        let entry_count = entries.len();

        let archive_path = path.clone();
        tokio::task::spawn_blocking(move || {
            write_archive(&archive_path, &entries, manifest.as_deref())
        })
        .await?
        .map_err(|e| ConversionError::Packaging(e.to_string()))?;

        self.metrics.record_archive();
        info!(entries = entry_count, failures = failures.len(), "Archive built");

        Ok(Package::Archive(ArchiveInfo {
            path,
            entries: entry_count,
            failures: failures.len(),
        }))
    }
}

/// Flat `(entry name, source path)` pairs. A repeated display name keeps
/// the later file.
fn archive_entries(files: &[&ConvertedFile]) -> Vec<(String, PathBuf)> {
    let mut entries: Vec<(String, PathBuf)> = Vec::with_capacity(files.len());
    for file in files {
        if let Some(pos) = entries.iter().position(|(name, _)| *name == file.display_name) {
            warn!(name = %file.display_name, "Duplicate archive entry, keeping the later file");
            entries.remove(pos);
        }
        entries.push((file.display_name.clone(), file.path.clone()));
    }
    entries
}

fn failure_manifest(failures: &[FileFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}\n", f.source_name, f.message))
        .collect()
}

fn entry_options(name: &str) -> SimpleFileOptions {
    let stored = FsUtils::extension_of(name)
        .is_some_and(|ext| STORED_EXTENSIONS.contains(&ext.as_str()));
    let method = if stored {
        CompressionMethod::Stored
    } else {
        CompressionMethod::Deflated
    };
    SimpleFileOptions::default().compression_method(method)
}

fn write_archive(
    path: &Path,
    entries: &[(String, PathBuf)],
    manifest: Option<&str>,
) -> ZipResult<()> {
    let mut zip = ZipWriter::new(File::create(path)?);

    for (name, source) in entries {
        zip.start_file(name.as_str(), entry_options(name))?;
        let mut input = File::open(source)?;
        std::io::copy(&mut input, &mut zip)?;
    }

    if let Some(text) = manifest {
        zip.start_file(FAILURE_MANIFEST, entry_options(FAILURE_MANIFEST))?;
        zip.write_all(text.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}
