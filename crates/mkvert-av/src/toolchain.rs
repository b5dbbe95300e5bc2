//! The external programs behind each pipeline step.
//!
//! [`MediaTools`] is the seam between the pipeline and the processes it
//! runs; [`ExternalTools`] is the real implementation on mkvtoolnix,
//! ass2srt, ffmpeg and SublerCLI.

use crate::command::{OutputStream, ToolCommand, DEFAULT_TIMEOUT};
use crate::progress::{DurationProgress, ProgressSink};
use crate::tools::{Tool, ToolPaths};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// One method per external step. Implementations block until the step is
/// done and report non-zero exits as errors.
pub trait MediaTools {
    /// Raw track listing of `file`.
    fn identify(&self, file: &Path) -> Result<String>;

    /// Write track `track_id` of `file` to `dest`.
    fn extract_track(&self, file: &Path, track_id: u32, dest: &Path) -> Result<()>;

    /// Convert `ass` into an SRT file next to it with the same base name.
    fn convert_ass_to_srt(&self, ass: &Path) -> Result<()>;

    /// Copy audio and video of `source` into `target` without re-encoding.
    fn repackage(&self, source: &Path, target: &Path, sink: &mut dyn ProgressSink) -> Result<()>;

    /// Re-encode `source` into `target`.
    fn transcode(&self, source: &Path, target: &Path, sink: &mut dyn ProgressSink) -> Result<()>;

    /// Add the SRT file `subtitles` to `target` in place.
    fn mux_subtitles(&self, target: &Path, subtitles: &Path) -> Result<()>;
}

/// ffmpeg transcode settings (H.264/AAC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeSettings {
    /// x264 constant rate factor (default: 20).
    pub video_crf: u32,
    /// x264 preset (default: slow).
    pub video_preset: String,
    /// AAC bitrate (default: 160k).
    pub audio_bitrate: String,
    /// Maximum width (default: 1280).
    pub max_width: u32,
    /// Maximum height (default: 720).
    pub max_height: u32,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            video_crf: 20,
            video_preset: "slow".to_string(),
            audio_bitrate: "160k".to_string(),
            max_width: 1280,
            max_height: 720,
        }
    }
}

/// [`MediaTools`] backed by real executables.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    paths: ToolPaths,
    timeout: Duration,
    transcode_timeout: Option<Duration>,
    nice: u8,
    settings: TranscodeSettings,
}

impl ExternalTools {
    pub fn new(paths: ToolPaths) -> Self {
        Self {
            paths,
            timeout: DEFAULT_TIMEOUT,
            transcode_timeout: None,
            nice: 0,
            settings: TranscodeSettings::default(),
        }
    }

    /// Timeout for identify, extract, convert and mux.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout for repackage and transcode; `None` waits indefinitely.
    pub fn with_transcode_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transcode_timeout = timeout;
        self
    }

    /// Scheduling priority for ffmpeg runs (`nice -n`); 0 leaves it alone.
    pub fn with_nice(mut self, level: u8) -> Self {
        self.nice = level;
        self
    }

    pub fn with_settings(mut self, settings: TranscodeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &TranscodeSettings {
        &self.settings
    }

    fn command(&self, tool: Tool) -> Result<ToolCommand> {
        let mut cmd = ToolCommand::new(self.paths.resolve(tool)?);
        cmd.timeout(self.timeout);
        Ok(cmd)
    }

    fn encode_command(&self, source: &Path) -> Result<ToolCommand> {
        let mut cmd = self.command(Tool::Ffmpeg)?;
        cmd.nice(self.nice);
        match self.transcode_timeout {
            Some(t) => cmd.timeout(t),
            None => cmd.without_timeout(),
        };
        cmd.args(["-y", "-nostdin", "-i"]);
        cmd.arg(source);
        cmd.args(["-map", "0:v:0", "-map", "0:a:0"]);
        Ok(cmd)
    }

    /// ffmpeg arguments that follow the input for a transcode.
    pub fn transcode_args(&self) -> Vec<String> {
        let s = &self.settings;
        vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-profile:v".to_string(),
            "high".to_string(),
            "-crf".to_string(),
            s.video_crf.to_string(),
            "-preset".to_string(),
            s.video_preset.clone(),
            "-vf".to_string(),
            format!(
                "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2",
                s.max_width, s.max_height
            ),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            s.audio_bitrate.clone(),
            "-ac".to_string(),
            "2".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

impl MediaTools for ExternalTools {
    fn identify(&self, file: &Path) -> Result<String> {
        let mut cmd = self.command(Tool::Mkvmerge)?;
        cmd.arg("--identify").arg(file);
        // mkvmerge returns 0 for success, 1 for warnings (still OK), 2 for errors
        cmd.accept_exit_code(1);
        Ok(cmd.execute()?.stdout)
    }

    fn extract_track(&self, file: &Path, track_id: u32, dest: &Path) -> Result<()> {
        let mut spec = OsString::from(format!("{}:", track_id));
        spec.push(dest.as_os_str());

        let mut cmd = self.command(Tool::Mkvextract)?;
        cmd.arg(file).arg("tracks").arg(spec);
        cmd.accept_exit_code(1);
        cmd.execute()?;
        Ok(())
    }

    fn convert_ass_to_srt(&self, ass: &Path) -> Result<()> {
        let mut cmd = self.command(Tool::Ass2Srt)?;
        cmd.arg(ass);
        cmd.execute()?;
        Ok(())
    }

    fn repackage(&self, source: &Path, target: &Path, sink: &mut dyn ProgressSink) -> Result<()> {
        let mut cmd = self.encode_command(source)?;
        cmd.args(["-c", "copy", "-movflags", "+faststart"]);
        cmd.arg(target);
        cmd.run_with_progress(OutputStream::Stderr, &mut DurationProgress::new(), sink)?;
        Ok(())
    }

    fn transcode(&self, source: &Path, target: &Path, sink: &mut dyn ProgressSink) -> Result<()> {
        let mut cmd = self.encode_command(source)?;
        cmd.args(self.transcode_args());
        cmd.arg(target);
        cmd.run_with_progress(OutputStream::Stderr, &mut DurationProgress::new(), sink)?;
        Ok(())
    }

    fn mux_subtitles(&self, target: &Path, subtitles: &Path) -> Result<()> {
        let mut cmd = self.command(Tool::Subler)?;
        cmd.arg("-i").arg(target).arg("-s").arg(subtitles);
        cmd.execute()?;
        Ok(())
    }
}
