//! Media files, container kinds and sidecar path derivation.

use crate::inspect::Codec;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    /// Matroska container
    Mkv,
    /// MPEG-4 Part 14 container
    Mp4,
    /// Apple's MPEG-4 variant, the default target
    M4v,
    /// QuickTime container
    Mov,
    /// AVI container
    Avi,
    /// MPEG transport stream
    Ts,
}

impl Container {
    /// Get the file extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mkv => "mkv",
            Container::Mp4 => "mp4",
            Container::M4v => "m4v",
            Container::Mov => "mov",
            Container::Avi => "avi",
            Container::Ts => "ts",
        }
    }

    /// Identify a container from a path's final extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    /// Whether subtitle tracks can be pulled out of this container.
    pub fn supports_subtitle_extraction(&self) -> bool {
        matches!(self, Container::Mkv)
    }

    /// Video and audio codecs this container accepts without re-encoding,
    /// or `None` if it is never used as a repackage target.
    pub fn accepted_codecs(&self) -> Option<(Codec, Codec)> {
        match self {
            Container::Mp4 | Container::M4v | Container::Mov => Some((Codec::Avc, Codec::Aac)),
            Container::Mkv | Container::Avi | Container::Ts => None,
        }
    }

    /// Whether streams from this container can be copied into `target`.
    ///
    /// AVI and TS sources always transcode; their timestamps and stream
    /// packing do not carry over into MPEG-4 as-is.
    pub fn remuxable_into(&self, target: Container) -> bool {
        target.accepted_codecs().is_some()
            && matches!(
                self,
                Container::Mkv | Container::Mp4 | Container::M4v | Container::Mov
            )
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mkv" | "matroska" => Ok(Container::Mkv),
            "mp4" => Ok(Container::Mp4),
            "m4v" => Ok(Container::M4v),
            "mov" | "quicktime" => Ok(Container::Mov),
            "avi" => Ok(Container::Avi),
            "ts" | "mpegts" => Ok(Container::Ts),
            _ => Err(format!("Unknown container format: {}", s)),
        }
    }
}

/// A media file on disk with a recognized container extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
    container: Container,
}

impl MediaFile {
    /// Wrap a path whose extension names a known container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedFormat`] for a missing or unknown
    /// extension.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let container = Container::from_path(&path).ok_or_else(|| {
            Error::UnrecognizedFormat(format!("unsupported file extension: {}", path.display()))
        })?;
        Ok(Self { path, container })
    }

    /// Like [`MediaFile::new`], but a path without any extension gets
    /// `default`'s extension appended (`movie` becomes `movie.mkv`).
    pub fn resolve(path: impl Into<PathBuf>, default: Container) -> Result<Self> {
        let path = path.into();
        if path.extension().is_none() {
            let mut name = path.clone().into_os_string();
            name.push(".");
            name.push(default.extension());
            return Self::new(name);
        }
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn container(&self) -> Container {
        self.container
    }

    /// A file next to this one, sharing its base name, with `extension`.
    pub fn sidecar(&self, extension: &str) -> PathBuf {
        self.path.with_extension(extension)
    }

    /// Output path for converting this file into `target`. Only the final
    /// extension is replaced.
    pub fn derive_target(&self, target: Container) -> PathBuf {
        self.sidecar(target.extension())
    }
}

impl std::fmt::Display for MediaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
