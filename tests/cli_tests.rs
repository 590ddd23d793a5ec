//! Integration tests for the CLI interface

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/exec42.json")
}

fn cli(output_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("workflow-report").unwrap();
    cmd.env("WORKFLOW_REPORT_OUTPUT_DIR", output_dir.path())
        .env_remove("WORKFLOW_REPORT_TOPIC")
        .env_remove("WORKFLOW_REPORT_CONCURRENCY")
        .env_remove("WORKFLOW_REPORT_PAGE_SIZE")
        .env_remove("WORKFLOW_REPORT_MAX_RETRIES");
    cmd
}

#[test]
fn test_cli_help_lists_commands() {
    let mut cmd = Command::cargo_bin("workflow-report").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_missing_required_arguments() {
    let temp = TempDir::new().unwrap();
    cli(&temp)
        .args(["report", "-e", "exec-42"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--bucket"));
}

#[test]
fn test_inspect_prints_module_document() {
    let temp = TempDir::new().unwrap();
    cli(&temp)
        .args(["inspect", "-e", "exec-42", "--fixture"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Module\": \"Init Workflow Subset\""))
        .stdout(predicate::str::contains("\"Module\": \"Combine Data Subset\""))
        .stdout(predicate::str::contains("\"Percentage Failed\": 20.0"))
        .stdout(predicate::str::contains("\"total_time\": \"1:30:00\""))
        .stdout(predicate::str::contains("\"Index\"").not());
}

#[test]
fn test_inspect_latest_with_failures() {
    let temp = TempDir::new().unwrap();
    cli(&temp)
        .args(["inspect", "--latest", "confluence-workflow", "--failures", "--fixture"])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"exec-42\""))
        .stdout(predicate::str::contains("\"Index\": 3"))
        .stdout(predicate::str::contains("\"Value\": \"reach-7\""));
}

#[test]
fn test_report_writes_artifacts() {
    let temp = TempDir::new().unwrap();
    cli(&temp)
        .args([
            "report",
            "-e",
            "exec-42",
            "-t",
            "2024-04-01T00:00:00Z,2024-04-30T23:59:59Z",
            "-b",
            "reports-bucket",
            "-k",
            "runs/exec-42",
            "--fixture",
        ])
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("module_data_report.json"));

    let run_dir = temp.path().join("reports-bucket/runs/exec-42");
    let report = std::fs::read_to_string(run_dir.join("module_data_report.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(report["modules"].as_array().unwrap().len(), 3);
    assert_eq!(
        report["temporal_range"],
        "2024-04-01T00:00:00Z,2024-04-30T23:59:59Z"
    );

    let failures = std::fs::read_to_string(run_dir.join("module_data_failures.json")).unwrap();
    let failures: serde_json::Value = serde_json::from_str(&failures).unwrap();
    assert_eq!(failures["Combine Data Subset"][1]["Index"], 7);
}

#[test]
fn test_report_without_topic_exits_nonzero_after_writing() {
    let temp = TempDir::new().unwrap();
    cli(&temp)
        .env("WORKFLOW_REPORT_TOPIC", "no-such-topic")
        .args(["report", "-e", "exec-42", "-b", "reports", "-k", "run", "--fixture"])
        .arg(fixture())
        .assert()
        .code(6)
        .stderr(predicate::str::contains("no-such-topic"));

    assert!(temp
        .path()
        .join("reports/run/module_data_report.json")
        .exists());
    assert!(temp
        .path()
        .join("reports/run/module_data_failures.json")
        .exists());
}

#[test]
fn test_unknown_execution_exit_code() {
    let temp = TempDir::new().unwrap();
    cli(&temp)
        .args(["inspect", "-e", "exec-404", "--fixture"])
        .arg(fixture())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("exec-404"));
}

#[test]
fn test_memory_backend_requires_fixture() {
    let temp = TempDir::new().unwrap();
    cli(&temp)
        .args(["inspect", "-e", "exec-42"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--fixture"));
}

#[test]
fn test_invalid_config_file() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("report.toml");
    std::fs::write(&config, "concurrency = \"lots\"").unwrap();

    cli(&temp)
        .arg("--config")
        .arg(&config)
        .args(["inspect", "-e", "exec-42", "--fixture"])
        .arg(fixture())
        .assert()
        .code(2);
}
