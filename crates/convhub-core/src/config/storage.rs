//! Upload and output storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where uploads and converted files live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving raw uploads (one sub-directory per batch).
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Directory receiving converted outputs and archives.
    #[serde(default = "default_converted_dir")]
    pub converted_dir: PathBuf,
    /// Maximum request body size in bytes (default 512 MB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Keep batch directories after the response has been sent.
    #[serde(default)]
    pub retain_files: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            converted_dir: default_converted_dir(),
            max_upload_size_bytes: default_max_upload(),
            retain_files: false,
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./data/uploads")
}

fn default_converted_dir() -> PathBuf {
    PathBuf::from("./data/converted")
}

fn default_max_upload() -> u64 {
    536_870_912 // 512 MB
}
