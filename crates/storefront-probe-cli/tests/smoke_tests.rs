//! Smoke tests for the storefront-probe binary
//!
//! Nothing here launches a browser: `run` is only exercised with filters
//! that select no case or with arguments that fail validation.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn probe() -> Command {
    let mut cmd = Command::cargo_bin("storefront-probe").expect("storefront-probe binary should exist");
    cmd.env_remove("STOREFRONT_PROBE_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run storefront-probe");
    assert!(output.status.success(), "command failed: {output:?}");
    String::from_utf8(output.stdout).expect("utf-8 stdout")
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    probe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_flag() {
    probe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_subcommand_fails() {
    probe().assert().failure();
}

#[test]
fn test_run_help_lists_browser_flags() {
    probe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-sandbox"))
        .stdout(predicate::str::contains("--headed"))
        .stdout(predicate::str::contains("--timeout-ms"));
}

// ============================================================================
// List Tests
// ============================================================================

#[test]
fn test_list_all_cases() {
    let stdout = stdout_of(probe().arg("list"));
    assert_eq!(stdout.lines().count(), 35);
    assert!(stdout.contains("successful login"));
}

#[test]
fn test_list_filtered() {
    let stdout = stdout_of(probe().args(["list", "--filter", "sorting"]));
    assert_eq!(stdout.lines().count(), 4);
    assert!(stdout.lines().all(|line| line.contains("sorting")));
}

#[test]
fn test_list_json() {
    let stdout = stdout_of(probe().args(["list", "--format", "json"]));
    let cases: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(cases.as_array().map(Vec::len), Some(35));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_defaults() {
    probe()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://www.saucedemo.com/"));
}

#[test]
fn test_config_base_url_flag() {
    probe()
        .args(["config", "--base-url", "http://localhost:9000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:9000/"));
}

#[test]
fn test_config_from_file() {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("probe.yaml");
    fs::write(&path, "wait:\n  timeout_ms: 1234\n").expect("write config");

    probe()
        .args(["config", "--json", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1234"));
}

#[test]
fn test_config_from_environment() {
    probe()
        .arg("config")
        .env("STOREFRONT_PROBE_BASE_URL", "http://staging.shop.test")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://staging.shop.test/"));
}

#[test]
fn test_invalid_config_file() {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("probe.yaml");
    fs::write(&path, "wait:\n  timeout_ms: 0\n").expect("write config");

    probe()
        .args(["config", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_run_rejects_non_http_base_url() {
    probe()
        .args(["run", "--base-url", "ftp://x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_run_with_empty_selection_succeeds() {
    probe()
        .args(["run", "--filter", "zzz", "--color", "never"])
        .assert()
        .success();
}

#[test]
fn test_run_empty_selection_json_report() {
    let stdout = stdout_of(probe().args(["run", "--filter", "zzz", "--format", "json"]));
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(report["cases"].as_array().map(Vec::len), Some(0));
}
