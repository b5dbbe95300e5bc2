//! Progress scraping from encoder status output.
//!
//! Encoders rewrite one status line in place with carriage returns, so the
//! stream is split on both `\r` and `\n`. Two grammars are understood:
//!
//! - [`DurationProgress`]: ffmpeg style, `Duration: HH:MM:SS.d` once, then
//!   `time=...` on every status line. Reported as `PROGRESS: <n>` only when
//!   the percentage changes.
//! - [`StatusLineProgress`]: mencoder style, `(NN%) <fps>fps ... Trem: Nmin`
//!   on a single line. Reported on every matching line.

use regex::Regex;
use std::io::{BufRead, Write};
use std::sync::LazyLock;

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.(\d)").expect("valid duration regex")
});

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d{2}):(\d{2}):(\d{2})\.(\d)").expect("valid clock time regex")
});

static SECONDS_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=(\d+)\.(\d)").expect("valid seconds time regex"));

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)%\)\s+([0-9.]+)fps.*Trem:\s+(\d+)min").expect("valid status line regex")
});

/// One progress report.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Completion percentage, 0 to 100.
    Percent(u8),
    /// Combined encoder status.
    Status {
        percent: u8,
        fps: String,
        remaining_minutes: u32,
    },
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressEvent::Percent(p) => write!(f, "PROGRESS: {}", p),
            ProgressEvent::Status {
                percent,
                fps,
                remaining_minutes,
            } => write!(
                f,
                "Percent complete: {}%.  Time remaining: {}min. Speed: {}fps",
                percent, remaining_minutes, fps
            ),
        }
    }
}

/// Turns status lines into progress events.
pub trait ProgressParser {
    /// Feed one `\r`/`\n`-delimited line; returns an event to report, if any.
    fn feed(&mut self, line: &str) -> Option<ProgressEvent>;
}

/// Where progress events go.
pub trait ProgressSink {
    fn report(&mut self, event: &ProgressEvent);

    /// Called once after the process exits.
    fn finish(&mut self) {}
}

/// ffmpeg-style elapsed-over-duration progress, de-duplicated.
///
/// All times are kept in tenths of a second.
#[derive(Debug, Default)]
pub struct DurationProgress {
    duration: Option<u64>,
    last: Option<u8>,
}

impl DurationProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

fn tenths(h: &str, m: &str, s: &str, d: &str) -> Option<u64> {
    let h: u64 = h.parse().ok()?;
    let m: u64 = m.parse().ok()?;
    let s: u64 = s.parse().ok()?;
    let d: u64 = d.parse().ok()?;
    Some(((h * 60 + m) * 60 + s) * 10 + d)
}

fn elapsed_tenths(line: &str) -> Option<u64> {
    if let Some(c) = CLOCK_TIME.captures(line) {
        return tenths(&c[1], &c[2], &c[3], &c[4]);
    }
    let c = SECONDS_TIME.captures(line)?;
    let secs: u64 = c[1].parse().ok()?;
    let d: u64 = c[2].parse().ok()?;
    Some(secs * 10 + d)
}

impl ProgressParser for DurationProgress {
    fn feed(&mut self, line: &str) -> Option<ProgressEvent> {
        if self.duration.is_none() {
            if let Some(c) = DURATION.captures(line) {
                self.duration = tenths(&c[1], &c[2], &c[3], &c[4]);
            }
        }

        let elapsed = elapsed_tenths(line)?;
        let percent = match self.duration {
            Some(total) if total > 0 => (elapsed * 100 / total).min(100) as u8,
            _ => 0,
        };

        if self.last == Some(percent) {
            return None;
        }
        self.last = Some(percent);
        Some(ProgressEvent::Percent(percent))
    }
}

/// mencoder-style combined status line, reported on every line.
#[derive(Debug, Default)]
pub struct StatusLineProgress;

impl StatusLineProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressParser for StatusLineProgress {
    fn feed(&mut self, line: &str) -> Option<ProgressEvent> {
        let c = STATUS_LINE.captures(line)?;
        Some(ProgressEvent::Status {
            percent: c[1].parse::<u32>().ok()?.min(100) as u8,
            fps: c[2].to_string(),
            remaining_minutes: c[3].parse().ok()?,
        })
    }
}

/// Writes events to a stream: `PROGRESS:` lines one per line, status lines
/// rewriting the current terminal line.
pub struct WriterSink<W: Write> {
    out: W,
    rewriting: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rewriting: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl WriterSink<std::io::Stdout> {
    /// Sink over standard output, the channel orchestrating callers parse.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ProgressSink for WriterSink<W> {
    fn report(&mut self, event: &ProgressEvent) {
        // Progress output is best effort; a closed stdout must not fail an encode.
        let _ = match event {
            ProgressEvent::Percent(_) => writeln!(self.out, "{}", event),
            ProgressEvent::Status { .. } => {
                self.rewriting = true;
                write!(self.out, "\r{}    ", event)
            }
        };
        let _ = self.out.flush();
    }

    fn finish(&mut self) {
        if self.rewriting {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.rewriting = false;
        }
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&mut self, _event: &ProgressEvent) {}
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<ProgressEvent>,
    pub finished: bool,
}

impl ProgressSink for CollectingSink {
    fn report(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

/// Read `reader` to the end, calling `f` with every non-empty segment
/// delimited by `\r` or `\n`. Invalid UTF-8 is replaced.
pub fn for_each_status_line<R: BufRead>(
    mut reader: R,
    mut f: impl FnMut(&str),
) -> std::io::Result<()> {
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }

        let len = buf.len();
        for &byte in buf {
            if byte == b'\r' || byte == b'\n' {
                if !pending.is_empty() {
                    f(&String::from_utf8_lossy(&pending));
                    pending.clear();
                }
            } else {
                pending.push(byte);
            }
        }
        reader.consume(len);
    }

    if !pending.is_empty() {
        f(&String::from_utf8_lossy(&pending));
    }
    Ok(())
}
