use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use predicates::str::is_match;
use serde_json::Value;
use tempfile::TempDir;

use dmxtap_core::CaptureBuilder;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("dmxtap"))
}

/// One frame with two lit channels, ended by the next break.
fn write_sample_capture(path: &std::path::Path) {
    let mut values = [0u8; 512];
    values[0] = 255;
    values[9] = 32;
    let mut builder = CaptureBuilder::new();
    builder.frame(&values);
    builder.space(176);
    std::fs::write(path, builder.build()).expect("write capture");
}

#[test]
fn help_supports_analyse_and_analyze() {
    cmd()
        .arg("capture")
        .arg("analyse")
        .arg("--help")
        .assert()
        .success();
    cmd()
        .arg("capture")
        .arg("analyze")
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn version_includes_commit() {
    cmd().arg("--version").assert().success().stdout(
        contains("commit")
            .and(contains("built"))
            .and(is_match(r"commit\s+\w+").expect("regex")),
    );
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.spi");
    let report = temp.path().join("report.json");

    cmd()
        .arg("capture")
        .arg("analyze")
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("input file not found").and(contains("hint:")));
}

#[test]
fn unsupported_extension_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.txt");
    std::fs::write(&input, [0u8; 8]).expect("write input");

    cmd()
        .arg("capture")
        .arg("analyse")
        .arg(input)
        .arg("--stdout")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("unsupported input format"));
}

#[test]
fn analyse_writes_report_file() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.spi");
    let report = temp.path().join("report.json");
    write_sample_capture(&input);

    cmd()
        .arg("capture")
        .arg("analyse")
        .arg(&input)
        .arg("-o")
        .arg(&report)
        .arg("--quiet")
        .assert()
        .success();

    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(&report).expect("read report"))
            .expect("parse report");
    assert_eq!(json["report_version"], 1);
    assert_eq!(json["capture_summary"]["frames_total"], 1);
    assert_eq!(json["frames"][0]["nonzero_slots"], 2);
    assert_eq!(json["frames"][0]["peak_level"], 255);
}

#[test]
fn analyse_stdout_emits_json() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.spi");
    write_sample_capture(&input);

    let assert = cmd()
        .arg("capture")
        .arg("analyse")
        .arg(&input)
        .arg("--stdout")
        .arg("--quiet")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: Value = serde_json::from_str(&stdout).expect("parse stdout report");
    assert_eq!(json["capture_summary"]["frames_total"], 1);
}

#[test]
fn list_frames_prints_summary() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.spi");
    write_sample_capture(&input);

    cmd()
        .arg("capture")
        .arg("analyse")
        .arg(&input)
        .arg("--stdout")
        .arg("--list-frames")
        .assert()
        .success()
        .stderr(contains("Decoded frames:").and(contains("#0 nonzero_slots=2")));
}

#[test]
fn require_frames_fails_on_idle_line() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("idle.spi");
    std::fs::write(&input, vec![0xFFu8; 2048]).expect("write capture");

    cmd()
        .arg("capture")
        .arg("analyse")
        .arg(&input)
        .arg("--stdout")
        .arg("--quiet")
        .arg("--require-frames")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("no DMX frames decoded"));
}

#[test]
fn info_reports_sample_clock_metadata() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("capture.raw");
    std::fs::write(&input, vec![0u8; 2000]).expect("write capture");

    let assert = cmd()
        .arg("capture")
        .arg("info")
        .arg(&input)
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let json: Value = serde_json::from_str(&stdout).expect("parse info");
    assert_eq!(json["size_bytes"], 2000);
    assert_eq!(json["samples"], 16000);
    assert_eq!(json["sample_rate_hz"], 2_000_000);
    assert_eq!(json["duration_s"], 0.008);
}
