//! External tool discovery.
//!
//! Media conversions shell out to ffmpeg. The executable is resolved once
//! at startup: a configured path wins when it exists on disk, otherwise
//! [`which::which`] searches `PATH`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the media tool.
pub const FFMPEG: &str = "ffmpeg";

/// Availability information for a tool, reported by detailed health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

impl ToolInfo {
    /// Build the availability record for a resolved (or missing) tool.
    pub fn new(name: &str, path: Option<&Path>) -> Self {
        Self {
            name: name.to_string(),
            available: path.is_some(),
            path: path.map(Path::to_path_buf),
        }
    }
}

/// Locate a tool, preferring `configured` when it exists.
pub fn locate(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(
            tool = name,
            path = %path.display(),
            "Configured tool path does not exist, searching PATH"
        );
    }

    match which::which(name) {
        Ok(path) => {
            tracing::debug!(tool = name, path = %path.display(), "Found tool on PATH");
            Some(path)
        }
        Err(_) => {
            tracing::warn!(tool = name, "Tool not found; dependent conversions will fail");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_wins_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = dir.path().join("my-ffmpeg");
        std::fs::write(&fake, b"").expect("write");
        assert_eq!(locate(FFMPEG, Some(&fake)), Some(fake));
    }

    #[test]
    fn test_missing_tool_is_none() {
        assert_eq!(locate("convhub-no-such-tool", None), None);
        let info = ToolInfo::new("convhub-no-such-tool", None);
        assert!(!info.available);
    }

    #[test]
    fn test_missing_configured_path_falls_back() {
        let found = locate(
            "convhub-no-such-tool",
            Some(Path::new("/definitely/not/here")),
        );
        assert_eq!(found, None);
    }
}
