//! CLI integration tests for the `solo` subcommands.
//!
//! Uses `assert_cmd` to spawn the `solo` binary against configuration files
//! written into a temporary directory.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CONFIG: &str = r#"
[[section]]
name = "homepage"
title = "Home Page"
record_type = "HomePage"
access_code = "CMS_ACCESS_HomePageAdmin"

[[section.fields]]
name = "Content"
kind = "html"

[[caller]]
id = "admin"
token = "admin-token"
grants = ["EDIT", "PUBLISH", "UNPUBLISH", "CMS_ACCESS_HomePageAdmin"]

[[caller]]
id = "editor"
token = "editor-token"
grants = ["EDIT", "CMS_ACCESS_HomePageAdmin"]
"#;

/// Write `solo.toml` (with file storage inside the same directory).
fn workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let state = dir.path().join("state.json");
    let config = format!(
        "[storage]\npath = \"{}\"\n{}",
        state.display().to_string().replace('\\', "\\\\"),
        CONFIG
    );
    let path = dir.path().join("solo.toml");
    fs::write(&path, config).expect("write config");
    (dir, path)
}

/// Helper: create a Command for the `solo` binary with a clean environment.
fn solo() -> Command {
    let mut cmd = cargo_bin_cmd!("solo");
    cmd.env_remove("SOLO_PORT")
        .env_remove("SOLO_STORAGE_PATH")
        .env("SOLO_LOG", "warn");
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    solo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Single-record content administration",
        ));
}

#[test]
fn version_exits_0() {
    solo()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("solo"));
}

// ──────────────────────────────────────────────
// 2. Configuration errors
// ──────────────────────────────────────────────

#[test]
fn missing_config_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    solo()
        .args(["--config"])
        .arg(dir.path().join("absent.toml"))
        .arg("permissions")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading config"));
}

#[test]
fn invalid_grant_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("solo.toml");
    fs::write(&path, CONFIG.replace("\"UNPUBLISH\"", "\"CMS_ACCESS_Nope\"")).expect("write");
    solo()
        .arg("--config")
        .arg(&path)
        .arg("permissions")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown code 'CMS_ACCESS_Nope'"));
}

#[test]
fn json_errors_are_json() {
    let dir = TempDir::new().expect("tempdir");
    solo()
        .args(["--output", "json", "--config"])
        .arg(dir.path().join("absent.toml"))
        .arg("permissions")
        .assert()
        .failure()
        .stderr(predicate::str::contains("{\"error\":"));
}

// ──────────────────────────────────────────────
// 3. Inspection subcommands
// ──────────────────────────────────────────────

#[test]
fn permissions_lists_section_codes() {
    let (_dir, config) = workspace();
    solo()
        .arg("--config")
        .arg(&config)
        .arg("permissions")
        .assert()
        .success()
        .stdout(predicate::str::contains("CMS_ACCESS_HomePageAdmin"))
        .stdout(predicate::str::contains("Access to 'Home Page' section"))
        .stdout(predicate::str::contains("CMS Access"));
}

#[test]
fn status_creates_and_reports_record() {
    let (dir, config) = workspace();
    solo()
        .arg("--config")
        .arg(&config)
        .args(["status", "homepage", "--caller", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("record: HomePage #1 'HomePage'"))
        .stdout(predicate::str::contains("stages differ: no"))
        .stdout(predicate::str::contains("unpublish"));
    assert!(dir.path().join("state.json").exists());
}

#[test]
fn status_json_for_editor_only_offers_save() {
    let (_dir, config) = workspace();
    let output = solo()
        .arg("--config")
        .arg(&config)
        .args(["--output", "json", "status", "homepage", "--caller", "editor"])
        .output()
        .expect("run solo");
    assert!(output.status.success());
    let view: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let actions = view["actions"].as_array().expect("actions");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["kind"], "save");
}

#[test]
fn status_for_caller_without_access_fails() {
    let (_dir, config) = workspace();
    solo()
        .arg("--config")
        .arg(&config)
        .args(["status", "homepage", "--caller", "nobody"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("may not edit"));
}

#[test]
fn unknown_section_fails() {
    let (_dir, config) = workspace();
    solo()
        .arg("--config")
        .arg(&config)
        .args(["history", "blog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown section 'blog'"));
}

#[test]
fn history_survives_between_runs() {
    let (_dir, config) = workspace();
    solo()
        .arg("--config")
        .arg(&config)
        .args(["status", "homepage", "--caller", "admin"])
        .assert()
        .success();

    solo()
        .arg("--config")
        .arg(&config)
        .args(["history", "homepage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1    draft"))
        .stdout(predicate::str::contains("#2    live"))
        .stdout(predicate::str::contains("#3").not());
}

#[test]
fn storage_path_env_override() {
    let (dir, config) = workspace();
    let other = dir.path().join("other.json");
    solo()
        .arg("--config")
        .arg(&config)
        .env("SOLO_STORAGE_PATH", &other)
        .args(["status", "homepage", "--caller", "admin"])
        .assert()
        .success();
    assert!(other.exists());
    assert!(!dir.path().join("state.json").exists());
}
