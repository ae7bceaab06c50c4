//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd. Every test points the
//! binary at its own temporary data directory.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Temporary data directory plus a config file pointing at it
struct Workspace {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        Self::with_config("")
    }

    fn with_config(extra: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("hub.toml");
        let data_dir = temp_dir.path().join("data");
        fs::write(
            &config_path,
            format!("[storage]\ndata_dir = '{}'\n{}", data_dir.display(), extra),
        )
        .unwrap();
        Self { temp_dir, config_path }
    }

    fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("nexus-hub").unwrap();
        cmd.arg("--config")
            .arg(&self.config_path)
            .env_remove("NEXUS_DATA_DIR")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd().args(args).assert()
    }
}

fn stdout_json(assert: &assert_cmd::assert::Assert) -> serde_json::Value {
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

fn record_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", key))
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    Command::cargo_bin("nexus-hub")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nexus Hub"))
        .stdout(predicate::str::contains("visibility"))
        .stdout(predicate::str::contains("reorder"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    Command::cargo_bin("nexus-hub")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nexus-hub"))
        .stdout(predicate::str::contains("Build Information"))
        .stdout(predicate::str::contains("Profile schema: v1"));
}

#[test]
fn test_missing_subcommand() {
    Command::cargo_bin("nexus-hub").unwrap().assert().failure();
}

// ─────────────────────────────────────────────────────────────────
// Profile Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_first_run_creates_profile() {
    let ws = Workspace::new();
    let assert = ws.run(&["profile", "show", "--json"]).success();

    let profile = stdout_json(&assert);
    assert_eq!(profile["name"], "Nexus User");
    assert_eq!(profile["role"], "student");
    assert_eq!(profile["moduleVisibility"]["studentMode"], true);
    assert_eq!(profile["moduleVisibility"]["engineeringHQ"], false);
    assert!(record_path(&ws.data_dir(), "user_profile").exists());
}

#[test]
fn test_invalid_record_is_replaced() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.data_dir()).unwrap();
    fs::write(record_path(&ws.data_dir(), "user_profile"), "{not json").unwrap();

    let assert = ws.run(&["profile", "show", "--json"]).success();
    assert_eq!(stdout_json(&assert)["name"], "Nexus User");

    let kept = fs::read_to_string(record_path(&ws.data_dir(), "user_profile.corrupt")).unwrap();
    assert_eq!(kept, "{not json");
}

#[test]
fn test_legacy_record_is_migrated() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.data_dir()).unwrap();
    fs::write(
        record_path(&ws.data_dir(), "user_profile"),
        r#"{"name": "Ada", "role": "worker", "customTASubject": "Biology",
            "moduleVisibility": {"accounting": true}}"#,
    )
    .unwrap();

    let assert = ws.run(&["profile", "show", "--json"]).success();
    let profile = stdout_json(&assert);
    assert_eq!(profile["customSubject"], "Biology");
    assert_eq!(profile["schemaVersion"], 1);
    assert_eq!(profile["moduleVisibility"]["visionAide"], true);

    let stored = fs::read_to_string(record_path(&ws.data_dir(), "user_profile")).unwrap();
    assert!(!stored.contains("customTASubject"));
}

#[test]
fn test_reset_restores_first_run() {
    let ws = Workspace::new();
    ws.run(&["role", "worker"]).success();
    ws.run(&["profile", "reset"]).success();

    let assert = ws.run(&["profile", "show", "--json"]).success();
    assert_eq!(stdout_json(&assert)["role"], "student");
}

// ─────────────────────────────────────────────────────────────────
// Visibility Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_inferred_hq_needs_flag_and_label() {
    let ws = Workspace::new();
    ws.run(&["major", "add", "Mechanical Engineering"]).success();
    ws.run(&["visibility", "--explain", "engineeringHQ"])
        .success()
        .stdout(predicate::str::contains("hidden"));

    ws.run(&["toggle", "engineeringHQ", "--on"])
        .success()
        .stdout(predicate::str::contains("engineeringHQ: on"));
    ws.run(&["visibility", "--explain", "engineeringHQ"])
        .success()
        .stdout(predicate::str::contains("visible"))
        .stdout(predicate::str::contains("Mechanical Engineering"));
}

#[test]
fn test_visibility_lists_every_flag() {
    let ws = Workspace::new();
    ws.run(&["visibility"])
        .success()
        .stdout(predicate::str::contains("screenReaderOpt"))
        .stdout(predicate::str::contains("Professional"));
}

#[test]
fn test_unknown_flag_fails_with_code() {
    let ws = Workspace::new();
    ws.run(&["toggle", "payrollHQ"])
        .failure()
        .code(40)
        .stderr(predicate::str::contains("E400"));
}

#[test]
fn test_major_add_is_idempotent() {
    let ws = Workspace::new();
    ws.run(&["major", "add", "Law"]).success();
    ws.run(&["major", "add", "Law"])
        .success()
        .stdout(predicate::str::contains("already selected"));

    let assert = ws.run(&["profile", "show", "--json"]).success();
    let majors = stdout_json(&assert)["selectedMajors"].clone();
    let count = majors
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m.as_str() == Some("Law"))
        .count();
    assert_eq!(count, 1);
}

// ─────────────────────────────────────────────────────────────────
// Navigation and Ordering Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_nav_starts_with_always_on_entries() {
    let ws = Workspace::new();
    let assert = ws.run(&["nav", "--json"]).success();
    let nav = stdout_json(&assert);
    assert_eq!(nav["entries"][0]["id"], "home");
    assert_eq!(nav["entries"][1]["id"], "settings");
}

#[test]
fn test_reorder_persists() {
    let ws = Workspace::new();
    ws.run(&["reorder", "personal", "0"])
        .success()
        .stdout(predicate::str::contains(
            "Dashboard order: personal, professional, academic, accessibility",
        ));

    let assert = ws.run(&["profile", "show", "--json"]).success();
    assert_eq!(stdout_json(&assert)["dashboardOrder"][0], "personal");

    let assert = ws.run(&["nav", "--json"]).success();
    assert_eq!(stdout_json(&assert)["sections"][0]["id"], "personal");
}

#[test]
fn test_reorder_unknown_section() {
    let ws = Workspace::new();
    ws.run(&["reorder", "finance", "1"])
        .failure()
        .code(40)
        .stderr(predicate::str::contains("E401"));
}

// ─────────────────────────────────────────────────────────────────
// Knowledge Source Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_source_lifecycle() {
    let ws = Workspace::new();
    ws.run(&["source", "add", "Lecture 1", "--content", "Operant conditioning"])
        .success()
        .stdout(predicate::str::contains("Added source 1"));
    ws.run(&["source", "add", "Lecture 2", "--content", "Memory"])
        .success()
        .stdout(predicate::str::contains("Added source 2"));

    ws.run(&["source", "remove", "2"]).success();
    ws.run(&["source", "add", "Lecture 3", "--content", "Attention"])
        .success()
        .stdout(predicate::str::contains("Added source 3"));

    ws.run(&["source", "remove", "2"])
        .failure()
        .code(40)
        .stderr(predicate::str::contains("E405"));
    ws.run(&["source", "list"])
        .success()
        .stdout(predicate::str::contains("Lecture 1"))
        .stdout(predicate::str::contains("Lecture 3"));
}

// ─────────────────────────────────────────────────────────────────
// Assistant Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_offline_assistant_summarize() {
    let ws = Workspace::new();
    let assert = ws
        .run(&["assist", "summarize", "Mitochondria make ATP. They have their own DNA.", "--subject", "Biology"])
        .success();
    assert_eq!(stdout_json(&assert)["summary"], "Mitochondria make ATP.");
}

#[test]
fn test_disabled_assistant() {
    let ws = Workspace::with_config("\n[assistant]\nenabled = false\n");
    ws.run(&["assist", "research", "legal", "tort reform"])
        .failure()
        .code(50)
        .stderr(predicate::str::contains("E500"));
}

#[test]
fn test_unreachable_assistant_prints_notice() {
    let ws = Workspace::with_config(
        "\n[assistant]\nprovider = \"openai\"\nbase_url = \"http://127.0.0.1:9/v1\"\nmax_retries = 0\ntimeout_secs = 5\n",
    );
    ws.run(&["assist", "research", "legal", "tort reform"])
        .failure()
        .code(50)
        .stderr(predicate::str::contains("Notice"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_validate_nonexistent_file() {
    Command::cargo_bin("nexus-hub")
        .unwrap()
        .args(["config", "validate", "--config", "/nonexistent/hub.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E100"));
}
