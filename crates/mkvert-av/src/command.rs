//! Builder for executing external tool commands with timeout support.
//!
//! Commands are argument vectors handed straight to the OS; nothing goes
//! through a shell, so file names with quotes or spaces need no escaping.

use crate::progress::{for_each_status_line, ProgressParser, ProgressSink};
use crate::{Error, Result};
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Default command timeout: 5 minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How often a finished-output child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Lines of the scraped stream kept for error messages.
const TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8, `\r` and `\n` normalized to `\n`).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8, `\r` and `\n` normalized to `\n`).
    pub stderr: String,
}

/// Which output stream carries a tool's progress lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use mkvert_av::ToolCommand;
/// use std::path::PathBuf;
///
/// let output = ToolCommand::new(PathBuf::from("mkvmerge"))
///     .arg("--identify")
///     .arg("/path/to/video.mkv")
///     .execute()?;
/// println!("{}", output.stdout);
/// # Ok::<(), mkvert_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout: Option<Duration>,
    ok_codes: Vec<i32>,
    nice: Option<u8>,
}

#[derive(Debug)]
enum Chunk {
    Line(OutputStream, String),
    ReadError(std::io::Error),
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            ok_codes: vec![0],
            nice: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(s.as_ref().to_os_string());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl AsRef<OsStr>>) -> &mut Self {
        self.args
            .extend(iter.into_iter().map(|s| s.as_ref().to_os_string()));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    /// Let the process run for as long as it takes.
    pub fn without_timeout(&mut self) -> &mut Self {
        self.timeout = None;
        self
    }

    /// Treat an additional exit code as success (mkvtoolnix exits 1 on
    /// warnings).
    pub fn accept_exit_code(&mut self, code: i32) -> &mut Self {
        self.ok_codes.push(code);
        self
    }

    /// Run the program under `nice -n level`; 0 runs it directly.
    pub fn nice(&mut self, level: u8) -> &mut Self {
        self.nice = (level > 0).then_some(level);
        self
    }

    /// Short tool name used in errors and logs.
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// The command line, for logging only.
    pub fn display(&self) -> String {
        let mut parts = Vec::new();
        if let Some(level) = self.nice {
            parts.push(format!("nice -n {}", level));
        }
        parts.push(self.program.display().to_string());
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        parts.join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = match self.nice {
            Some(level) => {
                let mut cmd = Command::new("nice");
                cmd.arg("-n").arg(level.to_string()).arg(&self.program);
                cmd
            }
            None => Command::new(&self.program),
        };
        cmd.args(&self.args);
        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the program cannot be spawned.
    /// - [`Error::ToolTimeout`] if the timeout expires; the child is killed.
    /// - [`Error::ToolFailed`] on a non-accepted exit status (message
    ///   includes stderr).
    pub fn execute(&self) -> Result<ToolOutput> {
        self.run(None)
    }

    /// Execute the command, feeding every line of `stream` to `parser` and
    /// reporting the resulting events to `sink`.
    ///
    /// The sink's `finish` is called once the process has exited, whatever
    /// the outcome.
    pub fn run_with_progress(
        &self,
        stream: OutputStream,
        parser: &mut dyn ProgressParser,
        sink: &mut dyn ProgressSink,
    ) -> Result<ToolOutput> {
        self.run(Some((stream, parser, sink)))
    }

    fn run(
        &self,
        mut progress: Option<(OutputStream, &mut dyn ProgressParser, &mut dyn ProgressSink)>,
    ) -> Result<ToolOutput> {
        let tool = self.tool_name();

        #[cfg(feature = "tracing")]
        tracing::debug!("Running: {}", self.display());

        let mut child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::from_spawn(tool.clone(), e))?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(out) = child.stdout.take() {
            readers.push(spawn_reader(out, OutputStream::Stdout, tx.clone()));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(spawn_reader(err, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let scraped = progress.as_ref().map(|(stream, _, _)| *stream);
        let mut stdout = Captured::new(scraped == Some(OutputStream::Stdout));
        let mut stderr = Captured::new(scraped == Some(OutputStream::Stderr));
        let mut read_error = None;

        let outcome = loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break Ok(None);
            }

            let chunk = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    rx.recv_timeout(remaining)
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match chunk {
                Ok(Chunk::Line(stream, line)) => {
                    if let Some((scraped, parser, sink)) = progress.as_mut() {
                        if *scraped == stream {
                            if let Some(event) = parser.feed(&line) {
                                sink.report(&event);
                            }
                        }
                    }
                    match stream {
                        OutputStream::Stdout => stdout.push(line),
                        OutputStream::Stderr => stderr.push(line),
                    }
                }
                Ok(Chunk::ReadError(e)) => {
                    read_error.get_or_insert(e);
                }
                Err(RecvTimeoutError::Disconnected) => break wait_until(&mut child, deadline),
                Err(RecvTimeoutError::Timeout) => break Ok(None),
            }
        };

        if let Some((_, _, sink)) = progress.as_mut() {
            sink.finish();
        }

        let status = match outcome {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                #[cfg(feature = "tracing")]
                tracing::warn!("{} timed out, killed", tool);
                return Err(Error::ToolTimeout {
                    tool,
                    timeout: self.timeout.unwrap_or_default(),
                });
            }
            Err(e) => return Err(Error::Io(e)),
        };

        for reader in readers {
            let _ = reader.join();
        }
        if let Some(e) = read_error {
            return Err(Error::Io(e));
        }

        let output = ToolOutput {
            status,
            stdout: stdout.into_string(),
            stderr: stderr.into_string(),
        };

        let accepted = status
            .code()
            .map(|code| self.ok_codes.contains(&code))
            .unwrap_or(false);
        if !accepted {
            let detail = if output.stderr.trim().is_empty() {
                output.stdout.trim()
            } else {
                output.stderr.trim()
            };
            return Err(Error::tool_failed(
                tool,
                format!("exited with status {}: {}", status, detail),
            ));
        }

        Ok(output)
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    source: R,
    stream: OutputStream,
    tx: mpsc::Sender<Chunk>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let result = for_each_status_line(BufReader::new(source), |line| {
            let _ = tx.send(Chunk::Line(stream, line.to_string()));
        });
        if let Err(e) = result {
            let _ = tx.send(Chunk::ReadError(e));
        }
    })
}

/// Poll `child` until it exits or `deadline` passes (`Ok(None)`).
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Captured lines of one stream. A scraped progress stream can run to
/// millions of status lines, so only its tail is kept.
struct Captured {
    lines: VecDeque<String>,
    tail_only: bool,
}

impl Captured {
    fn new(tail_only: bool) -> Self {
        Self {
            lines: VecDeque::new(),
            tail_only,
        }
    }

    fn push(&mut self, line: String) {
        if self.tail_only && self.lines.len() == TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn into_string(self) -> String {
        let mut out = String::new();
        for line in self.lines {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CollectingSink, DurationProgress, ProgressEvent};
    use assert_matches::assert_matches;

    fn sh(script: &str) -> ToolCommand {
        let mut cmd = ToolCommand::new(PathBuf::from("sh"));
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn execute_echo() {
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345")).execute();
        assert_matches!(result, Err(Error::ToolNotFound { .. }));
    }

    #[test]
    fn non_zero_exit_is_tool_failed() {
        let result = sh("echo broken >&2; exit 2").execute();
        assert_matches!(
            result,
            Err(Error::ToolFailed { ref message, .. }) if message.contains("broken")
        );
    }

    #[test]
    fn accepted_warning_exit_code() {
        let output = sh("exit 1").accept_exit_code(1).execute().unwrap();
        assert_eq!(output.status.code(), Some(1));
    }

    #[test]
    fn timeout_fires() {
        let result = sh("sleep 10").timeout(Duration::from_millis(200)).execute();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
    }

    #[test]
    fn arguments_are_not_shell_interpreted() {
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("it's \"quoted\" $HOME")
            .execute()
            .unwrap();
        assert_eq!(output.stdout.trim(), "it's \"quoted\" $HOME");
    }

    #[test]
    fn nice_wraps_the_program() {
        let mut cmd = sh("echo niced");
        cmd.nice(10);
        assert_eq!(cmd.display(), "nice -n 10 sh -c echo niced");
        assert_eq!(cmd.tool_name(), "sh");

        let output = cmd.execute().unwrap();
        assert_eq!(output.stdout.trim(), "niced");
    }

    #[test]
    fn nice_zero_runs_directly() {
        let mut cmd = sh("true");
        cmd.nice(0);
        assert_eq!(cmd.display(), "sh -c true");
    }

    #[test]
    fn progress_is_scraped_from_stderr() {
        let script = r"printf 'Duration: 00:00:10.0\n' >&2; \
            printf 'time=00:00:05.0\rtime=00:00:05.0\rtime=00:00:10.0\r' >&2";
        let mut parser = DurationProgress::new();
        let mut sink = CollectingSink::default();
        sh(script)
            .run_with_progress(OutputStream::Stderr, &mut parser, &mut sink)
            .unwrap();
        assert_eq!(
            sink.events,
            vec![ProgressEvent::Percent(50), ProgressEvent::Percent(100)]
        );
        assert!(sink.finished);
    }
}
