//! Builds the tool runners from configuration.

use crate::config::Config;
use mkvert_av::{Encoder, ExternalTools, ToolInfo};
use std::io::Write;

/// Runner for the `mkvert` conversion steps.
pub fn external_tools(config: &Config) -> ExternalTools {
    ExternalTools::new(config.tools.paths.clone())
        .with_timeout(config.tools.timeout())
        .with_transcode_timeout(config.tools.transcode_timeout())
        .with_nice(config.tools.nice)
        .with_settings(config.transcode.clone())
}

/// Runner for `mp4maker` encodes.
pub fn encoder(config: &Config) -> Encoder {
    Encoder::new(config.tools.paths.clone())
        .with_timeout(config.tools.transcode_timeout())
        .with_nice(config.tools.nice)
}

/// Print one line per tool. Returns whether every tool was found.
pub fn write_tool_report(out: &mut impl Write, tools: &[ToolInfo]) -> std::io::Result<bool> {
    let mut all_ok = true;

    for tool in tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        write!(out, "{} {}", status, tool.name)?;
        if let Some(ref version) = tool.version {
            write!(out, " ({})", version.lines().next().unwrap_or(""))?;
        }
        if let Some(ref path) = tool.path {
            write!(out, " - {}", path.display())?;
        }
        writeln!(out)?;
    }

    Ok(all_ok)
}
