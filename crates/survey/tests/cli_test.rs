//! Integration tests for the `survey` binary.
//!
//! Argument parsing, help output and error exit codes, all without a
//! running backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// `survey` with every `SURVEY_*` variable cleared and the config
/// directory pointed at a path that does not exist.
fn survey_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("survey");
    cmd.env("HOME", "/tmp/survey-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/survey-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("SURVEY_PROFILE")
        .env_remove("SURVEY_BACKEND")
        .env_remove("SURVEY_EVENTS")
        .env_remove("SURVEY_TOKEN")
        .env_remove("SURVEY_OUTPUT")
        .env_remove("SURVEY_TIMEOUT")
        .env_remove("SURVEY_LOG_FILE")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = survey_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    survey_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("buildings")
            .and(predicate::str::contains("switch"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    survey_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("survey"));
}

// ── Usage errors ────────────────────────────────────────────────────

#[test]
fn test_unknown_subcommand_fails() {
    survey_cmd().arg("demolish").assert().code(2);
}

#[test]
fn test_fixture_add_requires_dimensions() {
    survey_cmd()
        .args(["--backend", "http://127.0.0.1:1", "fixtures", "add", "-B", "B1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--width"));
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_missing_backend_exits_with_usage_code() {
    survey_cmd()
        .args(["buildings", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No backend configured"));
}

#[test]
fn test_invalid_backend_url_is_rejected() {
    survey_cmd()
        .args(["--backend", "not a url", "rooms", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid URL"));
}

#[test]
fn test_unknown_profile_is_rejected() {
    survey_cmd()
        .args(["--profile", "nowhere", "buildings", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no profile named 'nowhere'"));
}

#[test]
fn test_import_of_missing_file_fails_before_contacting_backend() {
    survey_cmd()
        .args([
            "--backend",
            "http://127.0.0.1:1",
            "import",
            "/tmp/survey-cli-test-nonexistent/plan.xlsx",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a file"));
}

// ── Backend errors ──────────────────────────────────────────────────

#[test]
fn test_unreachable_backend_exits_with_connection_code() {
    let output = survey_cmd()
        .args(["--backend", "http://127.0.0.1:1", "--timeout", "5", "buildings", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "Expected exit code 7");
    let text = combined_output(&output);
    assert!(
        text.contains("Could not reach the survey backend"),
        "Expected connection failure in output:\n{text}"
    );
}
