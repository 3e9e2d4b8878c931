//! Smoke tests for the verificador CLI
//!
//! Everything here runs without a browser: argument handling, configuration
//! loading and the checks made before Chromium is launched.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the verificador binary, isolated from the caller's
/// working directory and environment
fn verificador(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("verificador").expect("verificador binary should exist");
    cmd.current_dir(dir.path()).env_remove("VERIFICA_URL").env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.3.0"));
}

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_no_args_fails() {
    let dir = TempDir::new().unwrap();
    verificador(&dir).assert().failure();
}

#[test]
fn test_run_help() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--only"))
        .stdout(predicate::str::contains("--fail-fast"));
}

// ============================================================================
// Init / Config
// ============================================================================

#[test]
fn test_init_writes_config() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("verifica.yaml"));

    let yaml = fs::read_to_string(dir.path().join("verifica.yaml")).unwrap();
    assert!(yaml.contains("https://react.dev"));
    assert!(yaml.contains("custom hook"));
}

#[test]
fn test_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("verifica.yaml"), "base_url: http://localhost\n").unwrap();

    verificador(&dir)
        .arg("init")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--force"));

    verificador(&dir).args(["init", "--force"]).assert().success();
    let yaml = fs::read_to_string(dir.path().join("verifica.yaml")).unwrap();
    assert!(yaml.contains("https://react.dev"));
}

#[test]
fn test_config_shows_defaults() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: https://react.dev"));
}

#[test]
fn test_config_url_override() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .args(["config", "--url", "http://localhost:3000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://localhost:3000"));
}

#[test]
fn test_config_check_reads_local_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("verifica.yaml"), "base_url: ftp://example.com\n").unwrap();
    verificador(&dir)
        .args(["config", "--check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .args(["list", "--config", "absent.yaml"])
        .assert()
        .code(2);
}

// ============================================================================
// List / Run preflight
// ============================================================================

#[test]
fn test_list_scenarios() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("landmarks"))
        .stdout(predicate::str::contains("theme-toggle"))
        .stdout(predicate::str::contains("focus-order"))
        .stdout(predicate::str::contains("search-favorites"));
}

#[test]
fn test_run_unknown_scenario() {
    let dir = TempDir::new().unwrap();
    verificador(&dir)
        .args(["run", "--only", "checkout"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown scenario 'checkout'"));
}

#[test]
fn test_run_invalid_focus_plan() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("broken.yaml");
    fs::write(
        &config,
        "focus:\n  - name: React\n    selector:\n      css: a\n    advance: 0\n",
    )
    .unwrap();
    verificador(&dir)
        .args(["run", "--config", config.to_str().unwrap()])
        .assert()
        .code(2);
}
