//! External tool detection and management.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// The external programs mkvert shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// `mkvmerge`, used for `--identify`.
    Mkvmerge,
    /// `mkvextract`, used to pull a subtitle track out of a Matroska file.
    Mkvextract,
    /// `ass2srt.pl`, converts `<base>.ass` into `<base>.srt`.
    Ass2Srt,
    /// `ffmpeg`, used to repackage or transcode into the target container.
    Ffmpeg,
    /// `SublerCLI`, muxes an SRT file into an MP4/M4V.
    Subler,
    /// `mencoder`, the encoder behind `mp4maker`.
    Mencoder,
}

impl Tool {
    /// Every tool, in the order `check-tools` reports them.
    pub const ALL: [Tool; 6] = [
        Tool::Mkvmerge,
        Tool::Mkvextract,
        Tool::Ass2Srt,
        Tool::Ffmpeg,
        Tool::Subler,
        Tool::Mencoder,
    ];

    /// Executable name looked up in `PATH`.
    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Mkvmerge => "mkvmerge",
            Tool::Mkvextract => "mkvextract",
            Tool::Ass2Srt => "ass2srt.pl",
            Tool::Ffmpeg => "ffmpeg",
            Tool::Subler => "SublerCLI",
            Tool::Mencoder => "mencoder",
        }
    }

    /// Argument that prints a version banner, if the tool has one.
    fn version_arg(&self) -> Option<&'static str> {
        match self {
            Tool::Mkvmerge | Tool::Mkvextract => Some("--version"),
            Tool::Ffmpeg => Some("-version"),
            Tool::Ass2Srt | Tool::Subler | Tool::Mencoder => None,
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Information about an external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Configured executable locations, one optional override per tool.
///
/// A configured path that does not exist falls back to a `PATH` lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default)]
    pub mkvmerge_path: Option<PathBuf>,
    #[serde(default)]
    pub mkvextract_path: Option<PathBuf>,
    #[serde(default)]
    pub ass2srt_path: Option<PathBuf>,
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
    #[serde(default)]
    pub subler_path: Option<PathBuf>,
    #[serde(default)]
    pub mencoder_path: Option<PathBuf>,
}

impl ToolPaths {
    /// The configured override for a tool.
    pub fn configured(&self, tool: Tool) -> Option<&Path> {
        match tool {
            Tool::Mkvmerge => self.mkvmerge_path.as_deref(),
            Tool::Mkvextract => self.mkvextract_path.as_deref(),
            Tool::Ass2Srt => self.ass2srt_path.as_deref(),
            Tool::Ffmpeg => self.ffmpeg_path.as_deref(),
            Tool::Subler => self.subler_path.as_deref(),
            Tool::Mencoder => self.mencoder_path.as_deref(),
        }
    }

    /// Resolve the executable for a tool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] if the tool is neither configured nor
    /// in `PATH`.
    pub fn resolve(&self, tool: Tool) -> Result<PathBuf> {
        get_tool_path(tool.binary_name(), self.configured(tool))
    }
}

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use mkvert_av::{check_tool, Tool, ToolPaths};
///
/// let info = check_tool(Tool::Mkvmerge, &ToolPaths::default());
/// if info.available {
///     println!("mkvmerge version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(tool: Tool, paths: &ToolPaths) -> ToolInfo {
    match paths.resolve(tool) {
        Ok(path) => {
            let version = tool.version_arg().and_then(|arg| detect_version(&path, arg));
            ToolInfo {
                name: tool.binary_name().to_string(),
                available: true,
                version,
                path: Some(path),
            }
        }
        Err(_) => ToolInfo {
            name: tool.binary_name().to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool mkvert and mp4maker use.
pub fn check_tools(paths: &ToolPaths) -> Vec<ToolInfo> {
    Tool::ALL.iter().map(|&tool| check_tool(tool, paths)).collect()
}

/// Require that a tool is available in `PATH`, returning its path.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over PATH lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    require_tool(name)
}

/// First line of the tool's version banner.
fn detect_version(path: &Path, version_arg: &str) -> Option<String> {
    let output = Command::new(path).arg(version_arg).output().ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
