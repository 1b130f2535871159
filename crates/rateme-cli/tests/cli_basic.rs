//! Basic CLI E2E tests.
//!
//! Each test points the binary at its own config and database inside a
//! temporary directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Write a config whose database lives in `dir`; returns the config path.
fn write_config(dir: &Path) -> PathBuf {
    let config = dir.join("config.toml");
    let db = dir.join("rateme.db");
    std::fs::write(
        &config,
        format!(
            "[thresholds]\nmin_install_days = 10\nmin_launch_times = 5\n\n\
             [store]\nnamespace = \"RateThisApp\"\ndatabase = '{}'\n",
            db.display()
        ),
    )
    .unwrap();
    config
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let config = dir.join("config.toml");
    let output = Command::new(env!("CARGO_BIN_EXE_rateme"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_launch_counts_and_status() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let first = run_json(dir.path(), &["launch"]);
    assert_eq!(first["launch_count"], 1);
    assert!(first["install_timestamp"].is_string());

    run_json(dir.path(), &["launch"]);
    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["launch_count"], 2);
    assert_eq!(status["opted_out"], false);
}

#[test]
fn test_resumed_launch_is_not_counted() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let (stdout, _, code) = run_cli(dir.path(), &["launch", "--resumed"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("not counted"));

    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["launch_count"], 0);
    assert!(status["install_timestamp"].is_null());
}

#[test]
fn test_check_triggers_after_configured_launches() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    run_json(dir.path(), &["launch"]);
    let waiting = run_json(dir.path(), &["check"]);
    assert_eq!(waiting["show"], false);
    assert_eq!(waiting["decision"]["decision"], "wait");
    assert_eq!(waiting["decision"]["launches_remaining"], 4);

    for _ in 0..4 {
        run_json(dir.path(), &["launch"]);
    }
    let due = run_json(dir.path(), &["check"]);
    assert_eq!(due["show"], true);
    assert_eq!(due["decision"]["reason"], "launch_count");

    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["launch_count"], 0);
}

#[test]
fn test_check_threshold_overrides() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    run_json(dir.path(), &["launch"]);
    let due = run_json(dir.path(), &["check", "--min-launches", "1"]);
    assert_eq!(due["show"], true);
    assert_eq!(due["thresholds"]["min_launch_times"], 1);
    assert_eq!(due["thresholds"]["min_install_days"], 10);
}

#[test]
fn test_opt_out_suppresses_check() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    for _ in 0..6 {
        run_json(dir.path(), &["launch"]);
    }
    let (_, _, code) = run_cli(dir.path(), &["opt-out"]);
    assert_eq!(code, 0);

    let check = run_json(dir.path(), &["check"]);
    assert_eq!(check["show"], false);
    assert_eq!(check["decision"]["decision"], "suppressed");

    run_cli(dir.path(), &["clear"]);
    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["opted_out"], true);
    assert_eq!(status["launch_count"], 0);
}

#[test]
fn test_rated_sets_both_flags() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let (_, _, code) = run_cli(dir.path(), &["rated"]);
    assert_eq!(code, 0);
    let status = run_json(dir.path(), &["status"]);
    assert_eq!(status["rated"], true);
    assert_eq!(status["opted_out"], true);
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "thresholds.min_launch_times"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");

    let (_, _, code) = run_cli(
        dir.path(),
        &["config", "set", "thresholds.min_launch_times", "2"],
    );
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "thresholds.min_launch_times"]);
    assert_eq!(stdout.trim(), "2");
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    write_config(dir.path());

    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "thresholds.bogus", "1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown config key"));
}
