//! Smoke tests for the siteprobe CLI
//!
//! Nothing here launches a browser: every run below stops at argument,
//! config or filter validation.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the siteprobe binary
fn siteprobe() -> Command {
    Command::cargo_bin("siteprobe").expect("siteprobe binary should exist")
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    siteprobe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_flag() {
    siteprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("kmslh.com"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_no_args_shows_help() {
    siteprobe().assert().failure();
}

#[test]
fn test_run_help() {
    siteprobe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--retries"))
        .stdout(predicate::str::contains("--trace"))
        .stdout(predicate::str::contains("--headed"));
}

// ============================================================================
// List
// ============================================================================

#[test]
fn test_list_all_scenarios() {
    siteprobe()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("roi calculator"))
        .stdout(predicate::str::contains("accessibility toggles"))
        .stdout(predicate::str::contains("book a demo"))
        .stdout(predicate::str::contains("knowledge center"));
}

#[test]
fn test_list_filtered() {
    siteprobe()
        .args(["list", "--filter", "roi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("roi calculator"))
        .stdout(predicate::str::contains("book a demo").not());
}

#[test]
fn test_list_no_match_fails() {
    siteprobe()
        .args(["list", "--filter", "nomatch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nomatch"));
}

// ============================================================================
// Run argument and config validation
// ============================================================================

#[test]
fn test_bad_trace_value() {
    siteprobe()
        .args(["run", "--trace", "sometimes"])
        .assert()
        .failure();
}

#[test]
fn test_headless_conflicts_with_headed() {
    siteprobe()
        .args(["run", "--headless", "--headed"])
        .assert()
        .failure();
}

#[test]
fn test_run_no_match_fails() {
    let dir = TempDir::new().unwrap();
    siteprobe()
        .current_dir(dir.path())
        .args(["run", "--filter", "nomatch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No scenario matches"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    siteprobe()
        .current_dir(dir.path())
        .args(["run", "--config", "missing.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_unknown_config_key_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("siteprobe.yaml"), "retries: 1\nbogus: true\n").unwrap();
    siteprobe()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn test_bad_base_url_fails() {
    let dir = TempDir::new().unwrap();
    siteprobe()
        .current_dir(dir.path())
        .args(["run", "--base-url", "ftp://kmslh.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}
