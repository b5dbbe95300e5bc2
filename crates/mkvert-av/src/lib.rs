//! # mkvert-av
//!
//! Subtitle-preserving video conversion over external media tools.
//!
//! This crate provides functionality for:
//! - Inspecting a container's tracks through `mkvmerge --identify`
//! - Deciding between repackaging and transcoding for a target container
//! - Extracting, converting and muxing subtitle tracks with sidecar cleanup
//! - Encoding with built-in mencoder/x264 profiles, single or two-pass
//! - Running tools with timeouts while scraping their progress output
//!
//! Nothing here decodes media; every byte of audio and video is handled by
//! the external programs.
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use mkvert_av::{ExternalTools, MediaFile, Pipeline, PipelineOptions, ToolPaths, WriterSink};
//!
//! let tools = ExternalTools::new(ToolPaths::default());
//! let source = MediaFile::new("/path/to/episode.mkv")?;
//! let outcome = Pipeline::new(&tools, PipelineOptions::default())
//!     .process(&source, None, &mut WriterSink::stdout())?;
//! println!("Wrote {}", outcome.target.display());
//! # Ok::<(), mkvert_av::Error>(())
//! ```

mod error;
pub mod command;
pub mod decision;
pub mod encode;
pub mod inspect;
pub mod media;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod toolchain;
pub mod tools;

// Re-exports
pub use command::{OutputStream, ToolCommand, ToolOutput};
pub use decision::{decide, should_repackage, Strategy};
pub use encode::{EncodeOptions, EncodePlan, Encoder};
pub use error::{Error, Result};
pub use inspect::{Codec, SubtitleKind, Track, TrackKind, TrackList};
pub use media::{Container, MediaFile};
pub use pipeline::{Outcome, Pipeline, PipelineOptions, TargetOrigin};
pub use profile::{EncodingProfile, ProfileTable};
pub use progress::{NullSink, ProgressEvent, ProgressSink, WriterSink};
pub use toolchain::{ExternalTools, MediaTools, TranscodeSettings};
pub use tools::{check_tool, check_tools, require_tool, Tool, ToolInfo, ToolPaths};
