//! CLI end-to-end tests
//!
//! Tests for the mkvert and mp4maker command-line interfaces. Conversion
//! tests run against stub tools, see `common::StubTools`.

#![cfg(unix)]

mod common;

use assert_cmd::prelude::*;
use common::{StubTools, ASS_LISTING};
use predicates::prelude::*;
use std::process::Command;

/// Get a command for the mkvert binary
#[allow(deprecated)]
fn mkvert_cmd() -> Command {
    Command::cargo_bin("mkvert").unwrap()
}

/// Get a command for the mp4maker binary
#[allow(deprecated)]
fn mp4maker_cmd() -> Command {
    Command::cargo_bin("mp4maker").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = mkvert_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = mkvert_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mkvert"))
        .stdout(predicate::str::contains("convert"));
}

#[test]
fn test_cli_convert_help() {
    let mut cmd = mkvert_cmd();
    cmd.args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force-transcode"));
}

#[test]
fn test_cli_check_tools_command() {
    let stubs = StubTools::new(ASS_LISTING);
    let mut cmd = mkvert_cmd();
    cmd.args(["--config", stubs.config().to_str().unwrap(), "check-tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mkvmerge"))
        .stdout(predicate::str::contains("SublerCLI"));
}

#[test]
fn test_cli_convert_nonexistent_file() {
    let stubs = StubTools::new(ASS_LISTING);
    let mut cmd = mkvert_cmd();
    cmd.args([
        "--config",
        stubs.config().to_str().unwrap(),
        "convert",
        "/nonexistent/path/movie.mkv",
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("ERROR"))
    .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_convert_ass_episode() {
    let stubs = StubTools::new(ASS_LISTING);
    let source = stubs.media("ep1.mkv");

    let mut cmd = mkvert_cmd();
    cmd.args([
        "--config",
        stubs.config().to_str().unwrap(),
        "convert",
        // Extension is added when missing
        source.with_extension("").to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("PROGRESS: 50\nPROGRESS: 100\n"))
    .stdout(predicate::str::contains("ERROR").not());

    assert!(stubs.path().join("ep1.m4v").exists());
    assert!(!stubs.path().join("ep1.ass").exists());
    assert!(!stubs.path().join("ep1.srt").exists());

    let calls = stubs.calls();
    let tools: Vec<&str> = calls
        .iter()
        .map(|c| c.split(' ').next().unwrap_or_default())
        .collect();
    assert_eq!(
        tools,
        ["mkvmerge", "ffmpeg", "mkvextract", "ass2srt", "SublerCLI"]
    );
    assert!(calls[1].contains("libx264"));
    assert!(calls[2].ends_with(&format!("tracks 2:{}", stubs.path().join("ep1.ass").display())));
}

#[test]
fn test_cli_convert_missing_target_fails_without_encoding() {
    let stubs = StubTools::new(ASS_LISTING);
    let source = stubs.media("ep1.mkv");
    let target = stubs.path().join("ep1.m4v");

    let mut cmd = mkvert_cmd();
    cmd.args([
        "--config",
        stubs.config().to_str().unwrap(),
        "convert",
        source.to_str().unwrap(),
        target.to_str().unwrap(),
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("ERROR"));

    assert!(stubs.calls().is_empty());
}

#[test]
fn test_cli_convert_mux_failure_cleans_up() {
    let stubs = StubTools::new(ASS_LISTING);
    stubs.failing("SublerCLI");
    let source = stubs.media("ep1.mkv");

    let mut cmd = mkvert_cmd();
    cmd.args([
        "-q",
        "--config",
        stubs.config().to_str().unwrap(),
        "convert",
        source.to_str().unwrap(),
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("ERROR"))
    .stderr(predicate::str::contains("simulated failure"));

    assert!(!stubs.path().join("ep1.ass").exists());
    assert!(!stubs.path().join("ep1.srt").exists());
}

#[test]
fn test_cli_probe_json() {
    let stubs = StubTools::new(ASS_LISTING);
    let source = stubs.media("ep1.mkv");

    let output = mkvert_cmd()
        .args([
            "--config",
            stubs.config().to_str().unwrap(),
            "probe",
            "--json",
            source.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["container"], "mkv");
    assert_eq!(report["subtitles"], "Ass");
    assert_eq!(report["strategy"], "transcode");
    assert_eq!(report["tracks"].as_array().unwrap().len(), 3);
}

#[test]
fn test_mp4maker_help_flag() {
    let mut cmd = mp4maker_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--two-pass"))
        .stdout(predicate::str::contains("--profile"));
}

#[test]
fn test_mp4maker_two_pass() {
    let stubs = StubTools::new(ASS_LISTING);
    let input = stubs.media("clip.avi");

    let mut cmd = mp4maker_cmd();
    cmd.args([
        "--config",
        stubs.config().to_str().unwrap(),
        "-2",
        "-p",
        "appletv-hd",
        input.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Using appletv-hd profile."))
    .stdout(predicate::str::contains("Two-pass encoding enabled."))
    .stdout(predicate::str::contains("Encoding "))
    .stdout(predicate::str::contains(
        "Percent complete: 50%.  Time remaining: 1min. Speed: 24.00fps",
    ));

    let calls = stubs.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains("-nosound") && calls[0].contains("pass=1"));
    assert!(calls[1].contains("pass=2") && calls[1].ends_with("clip.m4v"));
    assert!(stubs.path().join("clip.m4v").exists());
}

#[test]
fn test_mp4maker_aborts_on_first_failure() {
    let stubs = StubTools::new(ASS_LISTING);
    let missing = stubs.path().join("missing.avi");
    let present = stubs.media("present.avi");

    let mut cmd = mp4maker_cmd();
    cmd.args([
        "--config",
        stubs.config().to_str().unwrap(),
        missing.to_str().unwrap(),
        present.to_str().unwrap(),
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("ERROR"));

    assert!(!stubs.path().join("present.m4v").exists());
}

#[test]
fn test_mp4maker_keep_going() {
    let stubs = StubTools::new(ASS_LISTING);
    let missing = stubs.path().join("missing.avi");
    let present = stubs.media("present.avi");

    let mut cmd = mp4maker_cmd();
    cmd.args([
        "--config",
        stubs.config().to_str().unwrap(),
        "--keep-going",
        missing.to_str().unwrap(),
        present.to_str().unwrap(),
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("ERROR"));

    assert!(stubs.path().join("present.m4v").exists());
}

#[test]
fn test_mp4maker_unknown_profile() {
    let stubs = StubTools::new(ASS_LISTING);
    let input = stubs.media("clip.avi");

    let mut cmd = mp4maker_cmd();
    cmd.args([
        "--config",
        stubs.config().to_str().unwrap(),
        "--profile",
        "psp",
        input.to_str().unwrap(),
    ])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("ERROR"));
}
