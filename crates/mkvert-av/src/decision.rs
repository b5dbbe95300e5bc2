//! Repackage vs. transcode decision.

use crate::inspect::TrackList;
use crate::media::{Container, MediaFile};
use serde::Serialize;

/// How the target container gets its audio and video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Copy the existing streams into the new container.
    Repackage,
    /// Re-encode audio and video.
    Transcode,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Repackage => f.write_str("repackage"),
            Strategy::Transcode => f.write_str("transcode"),
        }
    }
}

/// Whether `tracks` already holds both a video and an audio track in the
/// codecs `target` accepts.
pub fn should_repackage(tracks: &TrackList, target: Container) -> bool {
    match target.accepted_codecs() {
        Some((video, audio)) => tracks.has_codec(video) && tracks.has_codec(audio),
        None => false,
    }
}

/// Pick the strategy for converting `source` into `target`.
///
/// `force_transcode` wins over everything else. A source whose container
/// cannot be repackaged, or that lacks a required track, falls back to
/// transcoding.
pub fn decide(
    source: &MediaFile,
    target: Container,
    tracks: &TrackList,
    force_transcode: bool,
) -> Strategy {
    if force_transcode {
        return Strategy::Transcode;
    }

    if !source.container().remuxable_into(target) {
        return Strategy::Transcode;
    }

    if should_repackage(tracks, target) {
        Strategy::Repackage
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "{} is missing a {}-compatible audio or video track, transcoding",
            source,
            target
        );
        Strategy::Transcode
    }
}
