//! End-to-end tests for the `rehearse` binary.
//!
//! Every test points `XDG_CONFIG_HOME` at a fresh temp dir so a developer's
//! own config file never leaks in, and uses a tool name that does not exist
//! so no real program is launched.

use std::path::Path;
use std::process::{Command, Output};

use rehearse_core::report::SessionReport;

const ABSENT_TOOL: &str = "rehearse-cli-test-absent-tool";

fn rehearse(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rehearse"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("REHEARSE_TOOL")
        .env_remove("REHEARSE_TOOL_PATH")
        .env_remove("REHEARSE_REGIONS_DIR")
        .env_remove("REHEARSE_REPORT_PATH")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch rehearse binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn phases_lists_every_phase() {
    let tmp = tempfile::TempDir::new().unwrap();
    let output = rehearse(
        tmp.path(),
        &["phases", "--seed", "5", "--regions-dir", "/nonexistent/regions"],
    );
    assert!(output.status.success(), "{output:?}");

    let text = stdout(&output);
    for key in ["credential_auto_detection", "resource_discovery", "interactive_mode"] {
        assert!(text.contains(key), "missing {key} in:\n{text}");
    }
    assert!(text.contains("Total: 201 commands in 11 phases"), "{text}");
}

#[test]
fn phases_rejects_unknown_phase() {
    let tmp = tempfile::TempDir::new().unwrap();
    let output = rehearse(tmp.path(), &["phases", "--phase", "time_travel"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("time_travel"));
}

#[test]
fn run_with_missing_tool_writes_degraded_report() {
    let tmp = tempfile::TempDir::new().unwrap();
    let report_path = tmp.path().join("out/report.json");

    let output = rehearse(
        tmp.path(),
        &[
            "run",
            "--tool",
            ABSENT_TOOL,
            "--phase",
            "credential_auto_detection",
            "--seed",
            "3",
            "--no-progress",
            "--report",
            report_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{output:?}");
    let text = stdout(&output);
    assert!(text.contains("Simulation Summary"), "{text}");
    assert!(text.contains("Degraded passes: 3"), "{text}");

    let report = SessionReport::load(&report_path).unwrap();
    assert_eq!(report.tool, ABSENT_TOOL);
    assert_eq!(report.seed, Some(3));
    assert!(!report.interrupted);
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.passed, 3);
    assert_eq!(report.summary.degraded_passes, 3);

    let shown = rehearse(
        tmp.path(),
        &["report", report_path.to_str().unwrap(), "--failures"],
    );
    assert!(shown.status.success(), "{shown:?}");
    assert!(stdout(&shown).contains("No failed commands."));
}

#[test]
fn fail_policy_scores_missing_tool_as_failures() {
    let tmp = tempfile::TempDir::new().unwrap();
    let report_path = tmp.path().join("report.json");

    let output = rehearse(
        tmp.path(),
        &[
            "run",
            "--tool",
            ABSENT_TOOL,
            "--phase",
            "credential_auto_detection",
            "--missing-tool",
            "fail",
            "--no-progress",
            "--report",
            report_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{output:?}");

    let report = SessionReport::load(&report_path).unwrap();
    assert_eq!(report.summary.failed, 3);
    assert_eq!(report.summary.degraded_passes, 0);

    let shown = rehearse(tmp.path(), &["report", report_path.to_str().unwrap()]);
    assert!(stdout(&shown).contains("3 failed commands"));
}

#[test]
fn unwritable_report_exits_one() {
    let tmp = tempfile::TempDir::new().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let report_path = blocker.join("report.json");

    let output = rehearse(
        tmp.path(),
        &[
            "run",
            "--tool",
            ABSENT_TOOL,
            "--phase",
            "credential_auto_detection",
            "--no-progress",
            "--report",
            report_path.to_str().unwrap(),
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("Simulation Summary"), "{text}");
    assert!(text.contains("Report was not saved."), "{text}");
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let tmp = tempfile::TempDir::new().unwrap();

    let first = rehearse(tmp.path(), &["init", "--tool", "drift"]);
    assert!(first.status.success(), "{first:?}");
    let path = tmp.path().join("rehearse/config.toml");
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("name = \"drift\""));

    let second = rehearse(tmp.path(), &["init"]);
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("--force"));

    let forced = rehearse(tmp.path(), &["init", "--force"]);
    assert!(forced.status.success());
}

#[test]
fn config_file_tool_is_used() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = tmp.path().join("rehearse");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        format!("[tool]\nname = \"{ABSENT_TOOL}\"\n\n[session]\nseed = 8\n"),
    )
    .unwrap();

    let output = rehearse(tmp.path(), &["phases", "--verbose", "--phase", "reporting"]);
    assert!(output.status.success(), "{output:?}");
    let text = stdout(&output);
    assert!(text.contains(&format!("{ABSENT_TOOL} report")), "{text}");
    assert!(text.contains("seed 8"), "{text}");
}
