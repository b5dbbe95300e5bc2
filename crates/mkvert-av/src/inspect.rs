//! Track inspection over `mkvmerge --identify` output.
//!
//! The identify command runs once per file. The captured text is kept in an
//! immutable [`TrackList`], and every lookup re-scans that text line by line,
//! matching codec signatures as literal substrings.

use crate::toolchain::MediaTools;
use crate::{Error, MediaFile, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TRACK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Track ID (\d+)").expect("valid track id regex"));

static TRACK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Track ID (\d+):\s*(\w+)\s*(?:\(([^)]*)\))?").expect("valid track line regex")
});

/// Codecs mkvert cares about, each with the signatures that identify it.
///
/// Older mkvmerge releases print Matroska codec ids (`S_TEXT/UTF8`), newer
/// ones print display names (`SubRip/SRT`); both spellings are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Codec {
    /// UTF-8 SubRip text subtitles
    Srt,
    /// Advanced SubStation Alpha subtitles
    Ass,
    /// H.264 video
    Avc,
    /// AAC audio
    Aac,
}

impl Codec {
    pub fn signatures(&self) -> &'static [&'static str] {
        match self {
            Codec::Srt => &["S_TEXT/UTF8", "SubRip/SRT"],
            Codec::Ass => &["S_TEXT/ASS", "SubStationAlpha"],
            Codec::Avc => &["V_MPEG4/ISO/AVC", "AVC/H.264"],
            Codec::Aac => &["A_AAC", "audio (AAC)"],
        }
    }
}

/// Broad track type as reported by mkvmerge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitles,
    Other,
}

/// A single stream inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    /// mkvmerge track id, unique within the file.
    pub id: u32,
    pub kind: TrackKind,
    /// Codec text from the identify line, e.g. `SubRip/SRT`.
    pub codec: String,
}

/// Subtitle flavour found in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SubtitleKind {
    #[default]
    None,
    /// Already SRT; extracted and muxed without conversion.
    TextUtf8,
    /// Needs ASS to SRT conversion before muxing.
    Ass,
}

impl SubtitleKind {
    /// Sidecar extension the extracted track is written with.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            SubtitleKind::None => None,
            SubtitleKind::TextUtf8 => Some("srt"),
            SubtitleKind::Ass => Some("ass"),
        }
    }
}

impl std::fmt::Display for SubtitleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitleKind::None => f.write_str("none"),
            SubtitleKind::TextUtf8 => f.write_str("SRT"),
            SubtitleKind::Ass => f.write_str("ASS"),
        }
    }
}

/// The resolved track listing of one media file.
#[derive(Debug, Clone)]
pub struct TrackList {
    output: String,
}

impl TrackList {
    /// Run the identify command for `file` and capture its listing.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the identify tool cannot be started.
    /// - [`Error::UnrecognizedFormat`] if the output lists no tracks.
    pub fn identify(tools: &dyn MediaTools, file: &MediaFile) -> Result<Self> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Identifying tracks in {}", file);

        let output = tools.identify(file.path())?;
        Self::parse(output).map_err(|e| match e {
            Error::UnrecognizedFormat(msg) => {
                Error::UnrecognizedFormat(format!("{}: {}", file, msg))
            }
            other => other,
        })
    }

    /// Wrap already-captured identify output.
    pub fn parse(output: impl Into<String>) -> Result<Self> {
        let output = output.into();
        if !output.lines().any(|line| line.contains("Track ID")) {
            return Err(Error::UnrecognizedFormat(
                "identify output lists no tracks".to_string(),
            ));
        }
        Ok(Self { output })
    }

    /// First track whose identify line contains `signature`.
    pub fn find_track(&self, signature: &str) -> Option<Track> {
        self.output
            .lines()
            .filter(|line| line.contains("Track ID") && line.contains(signature))
            .find_map(parse_track_line)
    }

    /// First track matching any of `codec`'s signatures, in signature order.
    pub fn find_codec(&self, codec: Codec) -> Option<Track> {
        codec
            .signatures()
            .iter()
            .find_map(|signature| self.find_track(signature))
    }

    pub fn has_codec(&self, codec: Codec) -> bool {
        self.find_codec(codec).is_some()
    }

    /// The subtitle track to carry over, preferring SRT over ASS.
    pub fn subtitle_track(&self) -> Option<(SubtitleKind, Track)> {
        if let Some(track) = self.find_codec(Codec::Srt) {
            return Some((SubtitleKind::TextUtf8, track));
        }
        self.find_codec(Codec::Ass)
            .map(|track| (SubtitleKind::Ass, track))
    }

    pub fn subtitle_kind(&self) -> SubtitleKind {
        self.subtitle_track()
            .map(|(kind, _)| kind)
            .unwrap_or_default()
    }

    /// Every track in identify order.
    pub fn tracks(&self) -> Vec<Track> {
        self.output.lines().filter_map(parse_track_line).collect()
    }
}

fn parse_track_line(line: &str) -> Option<Track> {
    if let Some(caps) = TRACK_LINE.captures(line) {
        let id = caps[1].parse().ok()?;
        let kind = match &caps[2] {
            "video" => TrackKind::Video,
            "audio" => TrackKind::Audio,
            "subtitles" => TrackKind::Subtitles,
            _ => TrackKind::Other,
        };
        let codec = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        return Some(Track { id, kind, codec });
    }

    // Unusual layout; the id alone is still enough to extract the track.
    let caps = TRACK_ID.captures(line)?;
    Some(Track {
        id: caps[1].parse().ok()?,
        kind: TrackKind::Other,
        codec: String::new(),
    })
}
