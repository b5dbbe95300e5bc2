//! mencoder batch encoding with the built-in profiles.

use crate::command::{OutputStream, ToolCommand};
use crate::profile::{EncodingProfile, ProfileTable};
use crate::progress::{ProgressSink, StatusLineProgress};
use crate::tools::{Tool, ToolPaths};
use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

const NULL_DEVICE: &str = if cfg!(windows) { "NUL" } else { "/dev/null" };

/// What to encode with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    pub profile: String,
    pub two_pass: bool,
    /// Video bitrate override in kbit/s.
    pub bitrate: Option<u32>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            profile: "ipod".to_string(),
            two_pass: false,
            bitrate: None,
        }
    }
}

/// The mencoder runs needed to encode one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    pub output: PathBuf,
    /// Argument vectors, one per mencoder run, in order.
    pub passes: Vec<Vec<OsString>>,
}

impl EncodePlan {
    /// Build the plan for `input`. The output is `input` with its final
    /// extension replaced by `m4v`.
    ///
    /// A two-pass plan runs the `-pass1` profile without audio into the null
    /// device, then the `-pass2` profile with audio into the output.
    pub fn new(input: &Path, options: &EncodeOptions) -> Result<Self> {
        let output = input.with_extension("m4v");
        if output == input {
            return Err(Error::InvalidInput(format!(
                "{} is already an m4v file",
                input.display()
            )));
        }

        let adjust = |profile: &EncodingProfile| match options.bitrate {
            Some(kbps) => profile.with_bitrate(kbps),
            None => *profile,
        };

        let passes = if options.two_pass {
            let (first, second) = ProfileTable::passes(&options.profile)?;
            vec![
                analysis_pass(input, &adjust(first)),
                final_pass(input, &adjust(second), &output),
            ]
        } else {
            let profile = ProfileTable::get(&options.profile)?;
            vec![final_pass(input, &adjust(profile), &output)]
        };

        Ok(Self { output, passes })
    }
}

fn analysis_pass(input: &Path, profile: &EncodingProfile) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![input.into(), "-nosound".into()];
    args.extend(profile.video_args().into_iter().map(OsString::from));
    args.push("-o".into());
    args.push(NULL_DEVICE.into());
    args
}

fn final_pass(input: &Path, profile: &EncodingProfile, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![input.into()];
    args.extend(profile.audio.to_args().into_iter().map(OsString::from));
    args.extend(profile.video_args().into_iter().map(OsString::from));
    args.push("-o".into());
    args.push(output.into());
    args
}

/// Runs encode plans through mencoder.
#[derive(Debug, Clone)]
pub struct Encoder {
    paths: ToolPaths,
    timeout: Option<Duration>,
    nice: u8,
}

impl Encoder {
    pub fn new(paths: ToolPaths) -> Self {
        Self {
            paths,
            timeout: None,
            nice: 0,
        }
    }

    /// Scheduling priority for mencoder (`nice -n`); 0 leaves it alone.
    pub fn with_nice(mut self, level: u8) -> Self {
        self.nice = level;
        self
    }

    /// Per-run timeout; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Encode `input`, reporting mencoder's status line to `sink`.
    /// Returns the output path.
    pub fn encode(
        &self,
        input: &Path,
        options: &EncodeOptions,
        sink: &mut dyn ProgressSink,
    ) -> Result<PathBuf> {
        if !input.is_file() {
            return Err(Error::InvalidInput(format!(
                "input file not found: {}",
                input.display()
            )));
        }

        let plan = EncodePlan::new(input, options)?;
        let mencoder = self.paths.resolve(Tool::Mencoder)?;

        for (_n, args) in plan.passes.iter().enumerate() {
            let mut cmd = ToolCommand::new(mencoder.clone());
            cmd.args(args).nice(self.nice);
            match self.timeout {
                Some(t) => cmd.timeout(t),
                None => cmd.without_timeout(),
            };

            #[cfg(feature = "tracing")]
            tracing::debug!("Pass {}/{}: {}", _n + 1, plan.passes.len(), cmd.display());

            cmd.run_with_progress(OutputStream::Stdout, &mut StatusLineProgress::new(), sink)?;
        }

        if !plan.output.is_file() {
            return Err(Error::missing_output(&plan.output));
        }
        Ok(plan.output)
    }
}
