//! Demo CLI tests
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::fs;

#[test]
fn test_demo_writes_report_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("steplog");
    cmd.arg("-n")
        .arg("2")
        .arg("-t")
        .arg("2")
        .arg("--tick-ms")
        .arg("1")
        .arg("--interval-secs")
        .arg("3600")
        .arg("--utc")
        .arg("-o")
        .arg(dir.path())
        .assert()
        .success();

    let stats = fs::read_to_string(dir.path().join("steplog.statistics.demo.log")).unwrap();
    for step in ["handle-request", "load", "query", "render"] {
        assert!(
            stats.contains(&format!("\tdemo\t{}\t4\t", step)),
            "missing {} in {}",
            step,
            stats
        );
    }

    let slowest = fs::read_to_string(dir.path().join("steplog.slowest.demo.log")).unwrap();
    assert_eq!(slowest.matches("<demo> --------------------").count(), 3);
    assert!(slowest.contains("(code in handle-request)"));
}

#[test]
fn test_demo_json_format() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("steplog");
    cmd.arg("-n")
        .arg("1")
        .arg("-t")
        .arg("1")
        .arg("--tick-ms")
        .arg("1")
        .arg("--interval-secs")
        .arg("3600")
        .arg("--format")
        .arg("json")
        .arg("-o")
        .arg(dir.path())
        .assert()
        .success();

    let stats = fs::read_to_string(dir.path().join("steplog.statistics.demo.log")).unwrap();
    for line in stats.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["session"], "demo");
        assert_eq!(value["count"], 1);
    }
}

#[test]
fn test_demo_reports_through_log_output() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("steplog");
    cmd.arg("-n")
        .arg("1")
        .arg("-t")
        .arg("1")
        .arg("--tick-ms")
        .arg("1")
        .arg("--interval-secs")
        .arg("3600")
        .assert()
        .success()
        .stderr(predicate::str::contains("steplog.statistics.demo"))
        .stderr(predicate::str::contains("handle-request"));
}

#[test]
fn test_config_file_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("steplog.toml");
    fs::write(&config, "channel_prefix = \"perf\"\nsample_capacity = 1\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("steplog");
    cmd.arg("-n")
        .arg("3")
        .arg("-t")
        .arg("1")
        .arg("--tick-ms")
        .arg("1")
        .arg("--interval-secs")
        .arg("3600")
        .arg("-c")
        .arg(&config)
        .arg("-o")
        .arg(dir.path())
        .assert()
        .success();

    let slowest = fs::read_to_string(dir.path().join("perf.slowest.demo.log")).unwrap();
    assert_eq!(slowest.matches("--------------------").count(), 1);
}

#[test]
fn test_config_file_can_disable_shutdown_flush() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("steplog.toml");
    fs::write(&config, "flush_on_shutdown = false\n").unwrap();
    let out = dir.path().join("reports");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("steplog");
    cmd.arg("-n")
        .arg("1")
        .arg("-t")
        .arg("1")
        .arg("--tick-ms")
        .arg("1")
        .arg("--interval-secs")
        .arg("3600")
        .arg("-c")
        .arg(&config)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    assert!(!out.join("steplog.statistics.demo.log").exists());
    assert!(!out.join("steplog.slowest.demo.log").exists());
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "sample_capacity = 0\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("steplog");
    cmd.arg("-c")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("sample_capacity must be > 0"));
}

#[test]
fn test_zero_threads_rejected() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("steplog");
    cmd.arg("-t")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--threads"));
}
