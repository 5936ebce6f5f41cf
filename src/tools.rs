// Locating the external tools
//
// Search order: the process search path first, then the app-owned local
// install directory. A system installation wins so user-managed upgrades
// take precedence. A missing tool is a normal outcome, not an error.

use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Extractor,
    Transcoder,
}

impl Tool {
    pub fn binary_name(&self) -> &'static str {
        match self {
            Self::Extractor => "yt-dlp",
            Self::Transcoder => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            Self::Extractor => "--version",
            Self::Transcoder => "-version",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolSource {
    System,
    Local,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub tool: Tool,
    pub available: bool,
    pub path: Option<PathBuf>,
    pub source: Option<ToolSource>,
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn missing(tool: Tool) -> Self {
        Self {
            tool,
            available: false,
            path: None,
            source: None,
            version: None,
        }
    }

    /// Command string for spawning; falls back to the bare binary name so
    /// callers can still surface the tool's own spawn error.
    pub fn command(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| self.tool.binary_name().to_string())
    }
}

/// Locate a tool on this machine. No network access.
pub fn locate(tool: Tool) -> ToolStatus {
    if let Some(path) = find_in_path(tool.binary_name()) {
        log::info!("[Tools] {} found on PATH: {:?}", tool.binary_name(), path);
        return ToolStatus {
            tool,
            available: true,
            version: probe_version(&path, tool),
            path: Some(path),
            source: Some(ToolSource::System),
        };
    }

    let local = local_tool_dir().join(exe_name(tool.binary_name()));
    if local.exists() {
        log::info!("[Tools] {} found locally: {:?}", tool.binary_name(), local);
        return ToolStatus {
            tool,
            available: true,
            version: probe_version(&local, tool),
            path: Some(local),
            source: Some(ToolSource::Local),
        };
    }

    log::warn!("[Tools] {} not found", tool.binary_name());
    ToolStatus::missing(tool)
}

fn exe_name(binary: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", binary)
    } else {
        binary.to_string()
    }
}

/// Directory where the app keeps its private tool copies.
pub fn local_tool_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mediaforge")
        .join("tools")
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let lookup = if cfg!(windows) { "where" } else { "which" };
    let output = Command::new(lookup).arg(binary).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(PathBuf::from(first))
}

fn probe_version(path: &PathBuf, tool: Tool) -> Option<String> {
    let output = Command::new(path).arg(tool.version_arg()).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .next()
        .map(|l| l.trim().chars().take(80).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_names() {
        assert_eq!(Tool::Extractor.binary_name(), "yt-dlp");
        assert_eq!(Tool::Transcoder.binary_name(), "ffmpeg");
    }

    #[test]
    fn test_missing_status_is_normal() {
        let status = ToolStatus::missing(Tool::Extractor);
        assert!(!status.available);
        assert_eq!(status.path, None);
        assert_eq!(status.command(), "yt-dlp");
    }

    #[cfg(unix)]
    #[test]
    fn test_find_in_path_resolves_shell() {
        // `sh` exists on every unix box this crate targets
        let path = find_in_path("sh");
        assert!(path.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_in_path_miss() {
        assert!(find_in_path("definitely-not-a-real-binary-xyz").is_none());
    }
}
