// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Integration tests for the framegrab CLI
//!
//! These tests verify CLI commands work correctly end-to-end using the
//! assert_cmd crate pattern. Tests are serial and some require hardware.

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::{env, fs, path::PathBuf, thread, time::Duration};

/// Small delay to allow the camera to be released between tests.
fn hardware_cleanup_delay() {
    thread::sleep(Duration::from_millis(500));
}

/// Helper to create a Command for the framegrab binary
/// Uses FRAMEGRAB_BIN environment variable if set, otherwise uses cargo run
fn framegrab_cmd() -> Command {
    if let Ok(bin_path) = env::var("FRAMEGRAB_BIN") {
        Command::new(bin_path)
    } else {
        let mut c = Command::new("cargo");
        c.args(["run", "--quiet", "--bin", "framegrab", "--"]);
        c
    }
}

fn camera() -> String {
    env::var("FRAMEGRAB_DEVICE").unwrap_or_else(|_| "/dev/video0".to_string())
}

/// Get the test data directory (target/testdata/framegrab-cli)
/// Creates it if it doesn't exist
fn get_test_data_dir() -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("target")
        .join("testdata")
        .join("framegrab-cli");

    fs::create_dir_all(&test_dir).expect("Failed to create test data directory");
    test_dir
}

// =============================================================================
// Basic CLI Tests (No Hardware Required)
// =============================================================================

#[test]
fn test_cli_help() {
    framegrab_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Video4Linux"))
        .stdout(predicate::str::contains("devices"))
        .stdout(predicate::str::contains("info"))
        .stdout(predicate::str::contains("controls"))
        .stdout(predicate::str::contains("capture"));
}

#[test]
fn test_cli_version() {
    framegrab_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("framegrab"));
}

#[test]
fn test_capture_help() {
    framegrab_cmd()
        .args(["capture", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--device"))
        .stdout(predicate::str::contains("--resolution"))
        .stdout(predicate::str::contains("--palettes"))
        .stdout(predicate::str::contains("--frames"));
}

#[test]
fn test_controls_help() {
    framegrab_cmd()
        .args(["controls", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("--plugins"));
}

#[test]
fn test_info_help() {
    framegrab_cmd()
        .args(["info", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--device"));
}

#[test]
fn test_unknown_subcommand() {
    framegrab_cmd().arg("stream").assert().failure().code(2);
}

#[test]
fn test_capture_invalid_resolution() {
    framegrab_cmd()
        .args(["capture", "-d", "/nonexistent/video99", "-r", "wide"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Invalid resolution"));
}

#[test]
fn test_capture_invalid_palette() {
    framegrab_cmd()
        .args(["capture", "-d", "/nonexistent/video99", "-p", "yuyv,bogus"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn test_capture_invalid_fps() {
    framegrab_cmd()
        .args(["capture", "-d", "/nonexistent/video99", "--fps", "0"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_info_missing_device() {
    framegrab_cmd()
        .args(["info", "-d", "/nonexistent/video99"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("cannot open video device"));
}

#[test]
fn test_info_not_a_capture_device() {
    framegrab_cmd()
        .args(["info", "-d", "/dev/null"])
        .assert()
        .failure()
        .code(4);
}

#[test]
fn test_controls_invalid_plugin() {
    framegrab_cmd()
        .args(["controls", "--plugins", "pwc,zoom", "list"])
        .assert()
        .failure()
        .code(2);
}

// =============================================================================
// Hardware Tests
// =============================================================================

#[test]
#[serial]
#[ignore = "requires camera hardware (run with --include-ignored on hardware)"]
fn test_info_json_output() {
    let output = framegrab_cmd()
        .args(["info", "--json", "-d", &camera()])
        .output()
        .expect("Command should execute");
    assert!(output.status.success());

    let info: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert!(info["name"].is_string());
    assert!(info["inputs"].is_array());
    hardware_cleanup_delay();
}

#[test]
#[serial]
#[ignore = "requires camera hardware (run with --include-ignored on hardware)"]
fn test_controls_list() {
    framegrab_cmd()
        .args(["controls", "-d", &camera(), "list"])
        .assert()
        .success();
    hardware_cleanup_delay();
}

#[test]
#[serial]
#[ignore = "requires camera hardware (run with --include-ignored on hardware)"]
fn test_capture_to_file() {
    let output = get_test_data_dir().join("capture.raw");
    let _ = fs::remove_file(&output);

    framegrab_cmd()
        .args(["capture", "-d", &camera(), "-r", "320x240", "-n", "10", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Frames captured:   10"));

    let size = fs::metadata(&output).expect("output file exists").len();
    assert!(size > 0, "captured file should not be empty");
    hardware_cleanup_delay();
}

#[test]
#[serial]
#[ignore = "requires camera hardware (run with --include-ignored on hardware)"]
fn test_capture_json_metrics() {
    let output = framegrab_cmd()
        .args(["capture", "--json", "-d", &camera(), "-n", "30"])
        .output()
        .expect("Command should execute");
    assert!(output.status.success());

    let metrics: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(metrics["frames_captured"], 30);
    assert!(metrics["throughput_fps"].as_f64().unwrap_or(0.0) > 0.0);
    hardware_cleanup_delay();
}
