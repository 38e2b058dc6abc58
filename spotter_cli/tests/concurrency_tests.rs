//! Concurrency tests for the spotter binary.
//!
//! These tests verify that several processes can safely append finished
//! session logs to the same outbox (file locking).

use assert_cmd::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const PLAN: &str = r#"{"name": "Quick", "exercises": [{"name": "Squat", "sets": 2, "reps": 5}]}"#;

fn bin_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin!("spotter").to_path_buf()
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn auto_run(plan: &Path, data_dir: &Path) {
    Command::new(bin_path())
        .arg("run")
        .arg("--plan")
        .arg(plan)
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--auto")
        .assert()
        .success();
}

fn count_outbox_lines(data_dir: &Path) -> usize {
    std::fs::read_to_string(data_dir.join("logs/session_logs.jsonl"))
        .expect("Failed to read outbox")
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count()
}

#[test]
fn test_sequential_sessions_append() {
    let temp_dir = setup_test_dir();
    let plan = temp_dir.path().join("plan.json");
    std::fs::write(&plan, PLAN).unwrap();
    let data_dir = temp_dir.path().join("data");

    for i in 0..5 {
        thread::sleep(Duration::from_millis(i * 5));
        auto_run(&plan, &data_dir);
    }

    assert_eq!(count_outbox_lines(&data_dir), 5);
}

#[test]
fn test_parallel_sessions_do_not_interleave() {
    let temp_dir = setup_test_dir();
    let plan = temp_dir.path().join("plan.json");
    std::fs::write(&plan, PLAN).unwrap();
    let data_dir = temp_dir.path().join("data");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let plan = plan.clone();
            let data_dir = data_dir.clone();
            thread::spawn(move || auto_run(&plan, &data_dir))
        })
        .collect();

    for handle in handles {
        handle.join().expect("session thread panicked");
    }

    let content =
        std::fs::read_to_string(data_dir.join("logs/session_logs.jsonl")).unwrap();
    for line in content.lines() {
        let value: serde_json::Value =
            serde_json::from_str(line).expect("every outbox line is a whole JSON document");
        assert_eq!(value["log"]["exercises_completed"][0]["name"], "Squat");
    }
    assert_eq!(count_outbox_lines(&data_dir), 4);
}
