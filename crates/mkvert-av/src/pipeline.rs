//! Per-input conversion pipeline: convert, carry subtitles over, clean up.
//!
//! Steps run in order and stop at the first failure. Subtitle sidecars
//! (`<base>.ass`, `<base>.srt`) are removed before [`Pipeline::process`]
//! returns, whatever the outcome.

use crate::decision::{decide, Strategy};
use crate::inspect::{SubtitleKind, Track, TrackList};
use crate::media::{Container, MediaFile};
use crate::progress::ProgressSink;
use crate::toolchain::MediaTools;
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Options for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Container of the derived target.
    pub target: Container,
    /// Re-encode even when the streams could be copied.
    pub force_transcode: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target: Container::M4v,
            force_transcode: false,
        }
    }
}

/// How the target file came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOrigin {
    /// Produced by this run.
    Converted(Strategy),
    /// Supplied by the caller and left as-is apart from the subtitle mux.
    Supplied,
}

/// A successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub target: PathBuf,
    pub origin: TargetOrigin,
    /// Subtitle format found in the source; `None` if nothing was muxed.
    pub subtitles: SubtitleKind,
}

/// Sequences the external steps for one input.
pub struct Pipeline<'a> {
    tools: &'a dyn MediaTools,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(tools: &'a dyn MediaTools, options: PipelineOptions) -> Self {
        Self { tools, options }
    }

    /// Convert `source` and mux its preferred subtitle track into the target.
    ///
    /// When `target` is given it must already exist; no encoding happens and
    /// only the subtitles are muxed into it. Otherwise the target path is
    /// derived from `source` and produced by repackaging or transcoding.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingOutput`] if a supplied target does not exist, or a
    ///   step did not produce the file it should have.
    /// - [`Error::InvalidInput`] if the source is missing, the derived
    ///   target would overwrite it, or `<base>.ass`/`<base>.srt` already
    ///   exists.
    /// - Any error from the underlying tools.
    pub fn process(
        &self,
        source: &MediaFile,
        target: Option<&Path>,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome> {
        let (target, origin, tracks) = match target {
            Some(target) => {
                if !target.is_file() {
                    return Err(Error::missing_output(target));
                }
                (target.to_path_buf(), TargetOrigin::Supplied, None)
            }
            None => {
                let (target, strategy, tracks) = self.convert(source, sink)?;
                (target, TargetOrigin::Converted(strategy), Some(tracks))
            }
        };

        let subtitles = if source.container().supports_subtitle_extraction() {
            let tracks = match tracks {
                Some(tracks) => tracks,
                None => TrackList::identify(self.tools, source)?,
            };
            self.carry_subtitles(source, &target, &tracks)?
        } else {
            #[cfg(feature = "tracing")]
            tracing::info!(
                "{} containers carry no extractable subtitles, skipping",
                source.container()
            );
            SubtitleKind::None
        };

        Ok(Outcome {
            target,
            origin,
            subtitles,
        })
    }

    fn convert(
        &self,
        source: &MediaFile,
        sink: &mut dyn ProgressSink,
    ) -> Result<(PathBuf, Strategy, TrackList)> {
        if !source.path().is_file() {
            return Err(Error::InvalidInput(format!(
                "source file not found: {}",
                source
            )));
        }

        let target = source.derive_target(self.options.target);
        if target == source.path() {
            return Err(Error::InvalidInput(format!(
                "{} is already a {} file",
                source, self.options.target
            )));
        }

        let tracks = TrackList::identify(self.tools, source)?;
        let strategy = decide(source, self.options.target, &tracks, self.options.force_transcode);

        match strategy {
            Strategy::Repackage => {
                #[cfg(feature = "tracing")]
                tracing::info!("Repackaging {} into {}", source, target.display());
                self.tools.repackage(source.path(), &target, sink)?;
            }
            Strategy::Transcode => {
                #[cfg(feature = "tracing")]
                tracing::info!("Transcoding {} to {}", source, target.display());
                self.tools.transcode(source.path(), &target, sink)?;
            }
        }
        expect_file(&target)?;

        Ok((target, strategy, tracks))
    }

    fn carry_subtitles(
        &self,
        source: &MediaFile,
        target: &Path,
        tracks: &TrackList,
    ) -> Result<SubtitleKind> {
        let Some((kind, track)) = tracks.subtitle_track() else {
            #[cfg(feature = "tracing")]
            tracing::info!("No subtitle track found in {}", source);
            return Ok(SubtitleKind::None);
        };

        let mut sidecars = Sidecars::default();
        let result = self.extract_and_mux(source, target, kind, &track, &mut sidecars);
        sidecars.cleanup();
        result.map(|()| kind)
    }

    fn extract_and_mux(
        &self,
        source: &MediaFile,
        target: &Path,
        kind: SubtitleKind,
        track: &Track,
        sidecars: &mut Sidecars,
    ) -> Result<()> {
        // Claim every sidecar up front so no tool runs when one is taken.
        let ass = match kind {
            SubtitleKind::Ass => Some(sidecars.claim(source.sidecar("ass"))?),
            _ => None,
        };
        let srt = sidecars.claim(source.sidecar("srt"))?;

        if let Some(ass) = ass {
            #[cfg(feature = "tracing")]
            tracing::info!("Exporting from ASS track {}", track.id);
            self.tools.extract_track(source.path(), track.id, &ass)?;
            expect_file(&ass)?;

            #[cfg(feature = "tracing")]
            tracing::info!("Converting subtitles from ASS to SRT");
            self.tools.convert_ass_to_srt(&ass)?;
        } else {
            #[cfg(feature = "tracing")]
            tracing::info!("Exporting SRT from track {}", track.id);
            self.tools.extract_track(source.path(), track.id, &srt)?;
        }
        expect_file(&srt)?;

        #[cfg(feature = "tracing")]
        tracing::info!("Muxing subtitles into {}", target.display());
        self.tools.mux_subtitles(target, &srt)
    }
}

fn expect_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::missing_output(path))
    }
}

/// Intermediate files to delete once the subtitles are muxed (or not).
///
/// Only paths that did not exist when claimed are tracked, so cleanup never
/// touches a file the run did not create.
#[derive(Debug, Default)]
struct Sidecars {
    paths: Vec<PathBuf>,
}

impl Sidecars {
    /// Track `path` for removal; call before the step that writes it.
    ///
    /// Fails with [`Error::InvalidInput`] if `path` already exists.
    fn claim(&mut self, path: PathBuf) -> Result<PathBuf> {
        if path.exists() {
            return Err(Error::InvalidInput(format!(
                "{} already exists; move it aside before converting",
                path.display()
            )));
        }
        self.paths.push(path.clone());
        Ok(path)
    }

    fn cleanup(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::info!("Cleaned up {}", path.display());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Failed to remove {}: {}", path.display(), _e);
                }
            }
        }
    }
}

impl Drop for Sidecars {
    fn drop(&mut self) {
        self.cleanup();
    }
}
