//! Error types for mkvert-av.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating external media tools.
///
/// None of these are retried. A pipeline step that fails aborts the rest of
/// that input's pipeline; sidecar cleanup still runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not installed or could not be started.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool exited with a non-zero status.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// An external tool ran longer than its configured timeout and was killed.
    #[error("tool timed out: {tool} after {timeout:?}")]
    ToolTimeout { tool: String, timeout: Duration },

    /// A step finished but the file it should have produced is not on disk.
    #[error("missing expected output: {}", path.display())]
    MissingOutput { path: PathBuf },

    /// Unsupported file extension or unparseable identify output.
    #[error("unrecognized format: {0}")]
    UnrecognizedFormat(String),

    /// No encoder profile with this name.
    #[error("unknown encoder profile: {0}")]
    UnknownProfile(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a missing output error.
    pub fn missing_output(path: impl Into<PathBuf>) -> Self {
        Self::MissingOutput { path: path.into() }
    }

    /// Map a spawn failure to [`Error::ToolNotFound`] when the executable is
    /// missing, keeping every other I/O error as-is.
    pub fn from_spawn(tool: impl Into<String>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                Self::tool_not_found(tool)
            }
            _ => Self::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn spawn_not_found_is_missing_dependency() {
        let err = Error::from_spawn(
            "mkvmerge",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_matches!(err, Error::ToolNotFound { ref tool } if tool == "mkvmerge");
    }

    #[test]
    fn spawn_other_errors_stay_io() {
        let err = Error::from_spawn(
            "mkvmerge",
            std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted"),
        );
        assert_matches!(err, Error::Io(_));
    }

    #[test]
    fn missing_output_message_names_path() {
        let err = Error::missing_output("/movies/ep1.srt");
        assert_eq!(err.to_string(), "missing expected output: /movies/ep1.srt");
    }
}
