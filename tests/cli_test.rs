//! CLI tests against the built binary
//!
//! Every project points its tools at binaries that don't exist, so results
//! don't depend on what is installed on the machine running the tests.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const MISSING_TOOLS: &str = r#"
[tools]
rg = "/nonexistent/recon-test/rg"
git = "/nonexistent/recon-test/git"
gh = "/nonexistent/recon-test/gh"
"#;

fn project(config: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("package.json"), "{}").unwrap();
    std::fs::write(temp.path().join(".recon.toml"), config).unwrap();
    temp
}

fn rcn(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rcn").unwrap();
    cmd.env_remove("RECON_AGENT")
        .env_remove("RECON_TIMEOUT")
        .env_remove("RECON_ROOT")
        .env("NO_COLOR", "1")
        .arg("--root")
        .arg(root.path());
    cmd
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is one JSON document")
}

#[test]
fn test_missing_optional_tool_succeeds_with_notice() {
    let root = project(MISSING_TOOLS);
    let output = rcn(&root).args(["--json", "prs"]).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    let doc = json_stdout(&output);
    assert_eq!(doc["command"], "prs");
    assert_eq!(doc["pull_requests"]["status"], "unavailable");
    assert_eq!(doc["pull_requests"]["tool"], "gh");
    assert_eq!(doc["notices"].as_array().unwrap().len(), 1);
}

#[test]
fn test_missing_required_tool_exits_127() {
    let root = project(MISSING_TOOLS);
    rcn(&root)
        .args(["search", "handle"])
        .assert()
        .code(127)
        .stdout(predicate::str::contains("▸ Matches (0)"))
        .stdout(predicate::str::contains("(unavailable: rg not found)"))
        .stderr(predicate::str::contains(
            "tool rg not found - install it to enable this check",
        ));
}

#[test]
fn test_missing_tool_notice_once_per_command() {
    let root = project(MISSING_TOOLS);
    let output = rcn(&root).args(["--json", "search", "handle"]).output().unwrap();

    assert_eq!(output.status.code(), Some(127));
    let doc = json_stdout(&output);
    assert_eq!(doc["matches"]["status"], "unavailable");
    assert_eq!(doc["files"]["status"], "unavailable");
    assert_eq!(doc["notices"].as_array().unwrap().len(), 1);
}

#[test]
fn test_traversal_rejected_with_exit_2() {
    let root = project(MISSING_TOOLS);
    rcn(&root)
        .args(["imports", "../../etc"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid input '../../etc'"));
}

#[test]
fn test_validation_error_is_structured_in_json_mode() {
    let root = project(MISSING_TOOLS);
    let output = rcn(&root)
        .args(["--json", "history", "/etc/passwd"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let doc = json_stdout(&output);
    assert_eq!(doc["command"], "history");
    assert_eq!(doc["error"]["kind"], "validation");
}

#[test]
fn test_agent_mode_headers() {
    let root = project(MISSING_TOOLS);
    rcn(&root)
        .env("RECON_AGENT", "1")
        .args(["todos"])
        .assert()
        .code(127)
        .stdout(predicate::str::contains("## TODO markers (0)"))
        .stdout(predicate::str::contains("▸").not());
}

#[test]
fn test_failing_optional_tool_degrades() {
    // `sh issue list ...` runs and fails: there is no script called "issue"
    let root = project("[tools]\ngh = \"sh\"\n");
    let output = rcn(&root).args(["--json", "issues"]).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    let doc = json_stdout(&output);
    assert_eq!(doc["issues"]["status"], "failed");
}

#[test]
fn test_global_flags_must_precede_command() {
    let root = project(MISSING_TOOLS);
    rcn(&root).args(["todos", "--json"]).assert().failure();
}

#[test]
fn test_bad_project_config() {
    let root = project("[limits\n");
    rcn(&root)
        .args(["todos"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn test_commands_lists_catalog() {
    let root = project(MISSING_TOOLS);
    rcn(&root)
        .args(["commands"])
        .assert()
        .success()
        .stdout(predicate::str::contains("orphans"))
        .stdout(predicate::str::contains("sections: Pages, Endpoints, Layouts"));
}
