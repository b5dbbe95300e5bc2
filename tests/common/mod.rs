//! Shared fixtures for the CLI tests.
//!
//! `StubTools` writes shell scripts that stand in for mkvmerge, mkvextract,
//! ass2srt.pl, ffmpeg, SublerCLI and mencoder, plus a config file pointing
//! at them. Each stub appends its arguments to `calls.log`.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const ASS_LISTING: &str = "File 'ep1.mkv': container: Matroska\n\
Track ID 0: video (HEVC/H.265/MPEG-H)\n\
Track ID 1: audio (Vorbis)\n\
Track ID 2: subtitles (SubStationAlpha)\n";

pub struct StubTools {
    pub dir: TempDir,
}

impl StubTools {
    /// Stubs where mkvmerge reports `listing` and every other tool succeeds.
    pub fn new(listing: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let stubs = Self { dir };

        let log = stubs.log_path();
        let log = log.display();

        stubs.script(
            "mkvmerge",
            &format!("echo \"mkvmerge $*\" >> '{log}'\ncat <<'EOF'\n{listing}EOF\n"),
        );
        stubs.script(
            "mkvextract",
            &format!("echo \"mkvextract $*\" >> '{log}'\nspec=$3\nprintf 'subs' > \"${{spec#*:}}\"\n"),
        );
        stubs.script(
            "ass2srt.pl",
            &format!("echo \"ass2srt $*\" >> '{log}'\nprintf 'subs' > \"${{1%.ass}}.srt\"\n"),
        );
        stubs.script(
            "ffmpeg",
            &format!(
                "echo \"ffmpeg $*\" >> '{log}'\n\
                 for last; do :; done\n\
                 printf '  Duration: 00:00:10.0, start: 0.000000\\n' >&2\n\
                 printf 'frame=1 time=00:00:05.0 bitrate=1\\rframe=2 time=00:00:05.0 bitrate=1\\rframe=3 time=00:00:10.0 bitrate=1\\r' >&2\n\
                 case \"$last\" in *.m4v) printf 'm4v' > \"$last\" ;; esac\n"
            ),
        );
        stubs.script("SublerCLI", &format!("echo \"SublerCLI $*\" >> '{log}'\n"));
        stubs.script(
            "mencoder",
            &format!(
                "echo \"mencoder $*\" >> '{log}'\n\
                 for last; do :; done\n\
                 printf 'Pos:  1.0s   25f (50%%) 24.00fps Trem:   1min   1mb  A-V:0.000 [1200:128]\\r'\n\
                 if [ \"$last\" != /dev/null ]; then printf 'm4v' > \"$last\"; fi\n"
            ),
        );

        stubs
    }

    /// Replace one stub with a script that fails.
    pub fn failing(&self, name: &str) {
        self.script(name, "echo 'simulated failure' >&2\nexit 2\n");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }

    /// Lines appended by the stubs so far.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Write a config file whose tool paths point at the stubs.
    pub fn config(&self) -> PathBuf {
        let bin = self.dir.path().join("bin");
        let config = format!(
            "[tools]\n\
             mkvmerge_path = \"{bin}/mkvmerge\"\n\
             mkvextract_path = \"{bin}/mkvextract\"\n\
             ass2srt_path = \"{bin}/ass2srt.pl\"\n\
             ffmpeg_path = \"{bin}/ffmpeg\"\n\
             subler_path = \"{bin}/SublerCLI\"\n\
             mencoder_path = \"{bin}/mencoder\"\n\
             timeout_secs = 30\n\
             transcode_timeout_secs = 30\n",
            bin = bin.display()
        );
        let path = self.dir.path().join("mkvert.toml");
        fs::write(&path, config).unwrap();
        path
    }

    /// Create an empty media file next to the stubs.
    pub fn media(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, "").unwrap();
        path
    }

    fn script(&self, name: &str, body: &str) {
        let bin = self.dir.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
