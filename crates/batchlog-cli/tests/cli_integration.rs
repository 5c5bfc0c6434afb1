//! CLI Integration Tests
//!
//! These tests run the `batchlog` binary end-to-end against stdin and
//! temporary files.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

fn cli_cmd() -> Command {
    Command::cargo_bin("batchlog").expect("Failed to find batchlog binary")
}

fn pipe_cmd(input: &str) -> Command {
    let mut cmd = cli_cmd();
    cmd.arg("pipe").write_stdin(input.to_string());
    cmd
}

// ============================================================================
// Pipe Command Tests
// ============================================================================

#[test]
fn test_pipe_echoes_lines_in_order() {
    let input: String = (0..250).map(|i| format!("line {}\n", i)).collect();

    let output = pipe_cmd(&input)
        .args(["--queue-size", "7"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), input);
}

#[test]
fn test_pipe_empty_input() {
    pipe_cmd("").assert().success().stdout(predicate::str::is_empty());
}

#[test]
fn test_pipe_with_severity() {
    pipe_cmd("disk full\n")
        .args(["--severity", "err"])
        .assert()
        .success()
        .stdout("[Error] disk full\n");
}

#[test]
fn test_pipe_with_timestamps() {
    let ts_line = predicate::str::is_match(r"^\[\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z\] \[Warning\] hello\n$")
        .unwrap();

    pipe_cmd("hello\n")
        .args(["--severity", "warning", "--timestamps"])
        .assert()
        .success()
        .stdout(ts_line);
}

#[test]
fn test_pipe_appends_to_output_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.log");

    pipe_cmd("first\n")
        .arg("--output")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    pipe_cmd("second\nthird\n")
        .arg("--output")
        .arg(&path)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\nthird\n");
}

#[test]
fn test_pipe_rejects_zero_queue_size() {
    pipe_cmd("x\n")
        .args(["--queue-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("flush_max_queue_size must be positive"));
}

#[test]
fn test_pipe_rejects_unknown_severity() {
    pipe_cmd("x\n")
        .args(["--severity", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loud"));
}

// ============================================================================
// JSON Round Trip
// ============================================================================

#[test]
fn test_json_pipe_then_read() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("records.jsonl");

    pipe_cmd("started\nstopped\n")
        .args(["--json", "--severity", "notice", "--output"])
        .arg(&path)
        .assert()
        .success();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains(r#""level":"notice""#));

    cli_cmd()
        .arg("read")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("NOTICE [batchlog] pipe: started"))
        .stdout(predicate::str::contains("NOTICE [batchlog] pipe: stopped"));
}

#[test]
fn test_read_missing_file_fails() {
    let temp = TempDir::new().unwrap();

    cli_cmd()
        .arg("read")
        .arg(temp.path().join("missing.jsonl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

// ============================================================================
// Help
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    cli_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pipe"))
        .stdout(predicate::str::contains("read"));
}
