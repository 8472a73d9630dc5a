//! Filesystem utilities for the conversion pipeline.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ConversionError;

/// Filesystem utility functions.
pub struct FsUtils;

impl FsUtils {
    /// Strip any client-side directory components from an uploaded name.
    ///
    /// Some browsers send `C:\Users\me\report.pdf`; both separators are
    /// handled regardless of host platform.
    pub fn base_name(name: &str) -> &str {
        name.rsplit(['/', '\\']).next().unwrap_or(name)
    }

    /// Lowercased extension of a file name, without the dot.
    pub fn extension_of(name: &str) -> Option<String> {
        let base = Self::base_name(name);
        let (stem, ext) = base.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Stem of a file name (base name without its last extension).
    pub fn stem_of(name: &str) -> &str {
        let base = Self::base_name(name);
        match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => base,
        }
    }

    /// Sanitize a filename stem for safe filesystem usage.
    pub fn sanitize_stem(filename: &str) -> String {
        let stem = Self::stem_of(filename);

        let sanitized: String = stem
            .chars()
            .filter_map(|c| {
                if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    Some(c)
                } else if c.is_whitespace() {
                    Some('_')
                } else {
                    None
                }
            })
            .take(200)
            .collect();

        let sanitized = sanitized.trim_start_matches('.');
        if sanitized.is_empty() {
            "unnamed_file".to_string()
        } else {
            sanitized.to_string()
        }
    }

    /// Generate unique filename: `[SanitizedStem]__[UUIDv7].[Extension]`.
    pub fn generate_unique_filename(original_name: &str, extension: &str) -> String {
        let stem = Self::sanitize_stem(original_name);
        let uuid = Uuid::now_v7().simple();
        format!("{}__{}.{}", stem, uuid, extension.trim_start_matches('.'))
    }

    /// Check that a converter actually produced output of at least
    /// `min_output_bytes`, returning its size.
    pub async fn validate_output(
        output_path: &Path,
        min_output_bytes: u64,
    ) -> Result<u64, ConversionError> {
        let metadata = match tokio::fs::metadata(output_path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConversionError::OutputNotCreated {
                    path: output_path.to_path_buf(),
                });
            }
            Err(e) => return Err(ConversionError::Io(e)),
        };

        let size = metadata.len();
        if size < min_output_bytes {
            return Err(ConversionError::OutputEmpty {
                path: output_path.to_path_buf(),
                size,
            });
        }

        Ok(size)
    }

    /// Remove a file, ignoring "not found". Failures are logged.
    pub async fn remove_file_quietly(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
            }
        }
    }
}

/// Request-scoped working directories: `upload_root/<batch_id>/` and
/// `converted_root/<batch_id>/`.
#[derive(Debug, Clone)]
pub struct BatchWorkspace {
    /// Where raw uploads of this batch are saved.
    pub upload_dir: PathBuf,
    /// Where converted outputs (and the archive) of this batch are written.
    pub output_dir: PathBuf,
}

impl BatchWorkspace {
    /// Create both directories for `batch_id`.
    pub async fn create(
        upload_root: &Path,
        converted_root: &Path,
        batch_id: Uuid,
    ) -> Result<Self, ConversionError> {
        let name = batch_id.simple().to_string();
        let workspace = Self {
            upload_dir: upload_root.join(&name),
            output_dir: converted_root.join(&name),
        };

        tokio::fs::create_dir_all(&workspace.upload_dir).await?;
        tokio::fs::create_dir_all(&workspace.output_dir).await?;
        Ok(workspace)
    }

    /// Save an upload under a collision-free name and return its path.
    pub async fn save_upload(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<PathBuf, ConversionError> {
        let ext = FsUtils::extension_of(original_name).unwrap_or_else(|| "bin".to_string());
        let path = self
            .upload_dir
            .join(FsUtils::generate_unique_filename(original_name, &ext));
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Collision-free output path for a file whose display name is
    /// `display_name`.
    pub fn output_path_for(&self, display_name: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(FsUtils::generate_unique_filename(display_name, extension))
    }

    /// A guard that deletes both directories when dropped, so a dispatch
    /// that is cancelled mid-way does not leave them behind.
    pub fn guard(&self) -> WorkspaceGuard {
        WorkspaceGuard {
            dirs: Some([self.upload_dir.clone(), self.output_dir.clone()]),
        }
    }

    /// Delete both directories (best-effort).
    pub async fn remove(&self) {
        for dir in [&self.upload_dir, &self.output_dir] {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        "Failed to clean up batch directory"
                    );
                }
            }
        }
    }
}

/// Removes a batch's directories on drop unless disarmed.
///
/// Drop cannot await, so removal is synchronous.
#[derive(Debug)]
pub struct WorkspaceGuard {
    dirs: Option<[PathBuf; 2]>,
}

impl WorkspaceGuard {
    /// Keep the directories; their owner removes them later.
    pub fn disarm(mut self) {
        self.dirs = None;
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        let Some(dirs) = self.dirs.take() else {
            return;
        };
        for dir in dirs {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {
                    tracing::debug!(dir = %dir.display(), "Removed abandoned batch directory");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %e,
                        "Failed to remove abandoned batch directory"
                    );
                }
            }
        }
    }
}
