//! Smoke tests for the popshot CLI
//!
//! None of these launch a browser: every case either needs no page or fails
//! before launch.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the popshot binary
fn popshot() -> Command {
    Command::cargo_bin("popshot").expect("popshot binary should exist")
}

const GOOD_SCENARIO: &str = r##"
name: toggle
target:
  kind: static
  url: popup/popup.html
steps:
  - action: wait_for_text
    locator: { id: output }
    substring: Recent activity
  - action: click
    locator: { id: showChartBtn }
  - action: screenshot
    name: expanded
"##;

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    popshot()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_flag() {
    popshot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("popup"))
        .stdout(predicate::str::contains("builtin"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_no_args_fails() {
    popshot().assert().failure();
}

#[test]
fn test_list_builtins() {
    popshot()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("popup-toggle"))
        .stdout(predicate::str::contains("theme-round-trip"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_good_scenario() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("toggle.yaml");
    fs::write(&path, GOOD_SCENARIO).unwrap();

    popshot()
        .args(["--color", "never", "validate"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("checkpoints: expanded"));
}

#[test]
fn test_validate_bad_scenario() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "name: bad\ntarget:\n  kind: static\n  url: p.html\nsteps: []\n").unwrap();

    popshot()
        .args(["--color", "never", "validate"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

// ============================================================================
// Fake script
// ============================================================================

#[test]
fn test_fake_script_prints_script() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data.json");
    fs::write(&data, r#"{"usage": {"github.com": 180}}"#).unwrap();

    popshot()
        .args(["fake-script", "--data"])
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("__popshotFake"))
        .stdout(predicate::str::contains("github.com"));
}

#[test]
fn test_fake_script_writes_file() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data.json");
    let output = dir.path().join("fake.js");
    fs::write(&data, r#"{"theme": "dark"}"#).unwrap();

    popshot()
        .args(["--color", "never", "fake-script", "--mutable", "--data"])
        .arg(&data)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO Wrote fake script (1 keys)"));
    assert!(fs::read_to_string(&output).unwrap().contains("\"mutable\":true"));
}

#[test]
fn test_fake_script_quiet_writes_nothing_to_stderr() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data.json");
    fs::write(&data, "{}").unwrap();

    popshot()
        .args(["-q", "fake-script", "--data"])
        .arg(&data)
        .arg("-o")
        .arg(dir.path().join("fake.js"))
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_fake_script_rejects_non_object() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data.json");
    fs::write(&data, "[1, 2, 3]").unwrap();

    popshot()
        .args(["fake-script", "--data"])
        .arg(&data)
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
}

// ============================================================================
// Failures before launch
// ============================================================================

#[test]
fn test_settings_builtin_needs_extension() {
    popshot()
        .args(["builtin", "settings-centered"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs an extension directory"));
}

#[test]
fn test_unknown_builtin() {
    popshot()
        .args(["builtin", "popup-sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("available"));
}

#[test]
fn test_run_empty_scenario_fails_before_launch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.yaml");
    fs::write(&path, "name: empty\ntarget:\n  kind: static\n  url: p.html\nsteps: []\n").unwrap();

    popshot()
        .arg("run")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no steps"));
}

#[test]
fn test_run_missing_file() {
    popshot()
        .args(["run", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}
