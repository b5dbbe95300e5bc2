use mkvert_av::{ToolPaths, TranscodeSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub transcode: TranscodeSettings,

    #[serde(default)]
    pub encode: EncodeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(flatten)]
    pub paths: ToolPaths,

    /// Timeout for identify, extract, convert and mux steps (default: 300)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for transcodes and encodes; 0 waits indefinitely (default: 0)
    #[serde(default)]
    pub transcode_timeout_secs: u64,

    /// `nice -n` level for transcodes and encodes, 0 to 19; 0 disables
    /// (default: 19 on Unix)
    #[serde(default = "default_nice")]
    pub nice: u8,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            paths: ToolPaths::default(),
            timeout_secs: default_timeout_secs(),
            transcode_timeout_secs: 0,
            nice: default_nice(),
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn transcode_timeout(&self) -> Option<Duration> {
        match self.transcode_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_nice() -> u8 {
    if cfg!(unix) {
        19
    } else {
        0
    }
}

/// Defaults for `mp4maker`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncodeConfig {
    /// Encoder profile used when `--profile` is not given (default: "ipod")
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Two-pass encoding without `--two-pass` (default: false)
    #[serde(default)]
    pub two_pass: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            two_pass: false,
        }
    }
}

fn default_profile() -> String {
    "ipod".to_string()
}
