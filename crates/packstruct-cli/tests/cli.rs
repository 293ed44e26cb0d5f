use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("packstruct"))
}

fn repo_root() -> PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn golden(case: &str, file: &str) -> PathBuf {
    repo_root().join("tests").join("golden").join(case).join(file)
}

fn expected_hex(case: &str) -> String {
    fs::read_to_string(golden(case, "expected.hex"))
        .expect("read expected.hex")
        .split_whitespace()
        .collect()
}

fn write_packed(temp: &TempDir, case: &str) -> PathBuf {
    let output = temp.path().join(format!("{case}.bin"));
    cmd()
        .arg("pack")
        .arg(golden(case, "layouts.json"))
        .arg(golden(case, "values.json"))
        .arg("-o")
        .arg(&output)
        .assert()
        .success();
    output
}

fn values(case: &str) -> Value {
    let text = fs::read_to_string(golden(case, "values.json")).expect("read values.json");
    serde_json::from_str(&text).expect("valid json")
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("render").and(contains("pack")).and(contains("unpack")));
    for sub in ["render", "pack", "unpack"] {
        cmd().arg(sub).arg("--help").assert().success();
    }
}

#[test]
fn version_includes_build_commit() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("packstruct"));
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("commit"));
}

#[test]
fn render_resolves_sizes_from_values() {
    cmd()
        .arg("render")
        .arg(golden("something", "layouts.json"))
        .arg("--values")
        .arg(golden("something", "values.json"))
        .assert()
        .success()
        .stdout(contains("l< l< l< A11 x"));
}

#[test]
fn render_without_values_hints_at_dependency() {
    cmd()
        .arg("render")
        .arg(golden("something", "layouts.json"))
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")).and(contains("size")));
}

#[test]
fn render_static_layout() {
    cmd()
        .arg("render")
        .arg(golden("sensor_frame", "layouts.json"))
        .arg("--layout")
        .arg("sensor_frame")
        .assert()
        .success()
        .stdout(contains("S> C e G H2 A6 x2"));
}

#[test]
fn pack_hex_matches_golden_bytes() {
    for case in ["something", "sensor_frame", "offset_body"] {
        cmd()
            .arg("pack")
            .arg(golden(case, "layouts.json"))
            .arg(golden(case, "values.json"))
            .arg("--hex")
            .assert()
            .success()
            .stdout(contains(expected_hex(case)));
    }
}

#[test]
fn pack_requires_output_or_hex() {
    cmd()
        .arg("pack")
        .arg(golden("something", "layouts.json"))
        .arg(golden("something", "values.json"))
        .assert()
        .failure();
}

#[test]
fn pack_then_unpack_round_trips() {
    let temp = TempDir::new().expect("tempdir");
    for case in ["something", "offset_body", "sensor_frame"] {
        let packed = write_packed(&temp, case);
        for mode in ["whole", "stream"] {
            let assert = cmd()
                .arg("unpack")
                .arg(golden(case, "layouts.json"))
                .arg(&packed)
                .arg("--mode")
                .arg(mode)
                .assert()
                .success();
            let stdout =
                String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
            let decoded: Value = serde_json::from_str(&stdout).expect("valid json");
            assert_eq!(decoded, values(case), "{case} in {mode} mode");
        }
    }
}

#[test]
fn fast_mode_rejects_dependent_sizes() {
    let temp = TempDir::new().expect("tempdir");
    let packed = write_packed(&temp, "something");
    cmd()
        .arg("unpack")
        .arg(golden("something", "layouts.json"))
        .arg(&packed)
        .arg("--mode")
        .arg("fast")
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("--mode whole")));
}

#[test]
fn fast_mode_decodes_static_layout() {
    let temp = TempDir::new().expect("tempdir");
    let packed = write_packed(&temp, "sensor_frame");
    let assert = cmd()
        .arg("unpack")
        .arg(golden("sensor_frame", "layouts.json"))
        .arg(&packed)
        .arg("--mode")
        .arg("fast")
        .arg("--pretty")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    assert!(stdout.contains('\n'));
    let decoded: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(decoded, values("sensor_frame"));
}

#[test]
fn truncated_input_reports_hint() {
    let temp = TempDir::new().expect("tempdir");
    let short = temp.path().join("short.bin");
    fs::write(&short, [0x0b, 0, 0, 0, 1, 0]).expect("write input");
    cmd()
        .arg("unpack")
        .arg(golden("something", "layouts.json"))
        .arg(&short)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    cmd()
        .arg("unpack")
        .arg(golden("something", "layouts.json"))
        .arg(temp.path().join("missing.bin"))
        .assert()
        .failure()
        .stderr(contains("input file not found").and(contains("hint:")));
}

#[test]
fn unknown_layout_name_lists_choices() {
    cmd()
        .arg("render")
        .arg(golden("sensor_frame", "layouts.json"))
        .arg("--layout")
        .arg("nope")
        .assert()
        .failure()
        .stderr(contains("sensor_frame"));
}

#[test]
fn unknown_modifier_in_layout_file_fails() {
    let temp = TempDir::new().expect("tempdir");
    let layouts = temp.path().join("layouts.json");
    fs::write(
        &layouts,
        r#"{"layouts": [{"fields": [{"name": "x", "modifiers": ["uint16", "sideways"]}]}]}"#,
    )
    .expect("write layouts");
    cmd()
        .arg("render")
        .arg(&layouts)
        .assert()
        .failure()
        .stderr(contains("sideways").and(contains("hint:")));
}

#[test]
fn verbose_logs_to_stderr() {
    cmd()
        .arg("-vv")
        .arg("render")
        .arg(golden("sensor_frame", "layouts.json"))
        .assert()
        .success()
        .stderr(contains("finalized").and(contains("warning:").not()));
}

#[test]
fn oversized_length_prefix_fails_cleanly_in_every_mode() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("huge.bin");
    fs::write(&input, [0xff, 0xff, 0xff, 0xff, b'a', b'b', b'c']).expect("write input");
    for mode in ["whole", "stream"] {
        cmd()
            .arg("unpack")
            .arg(golden("offset_body", "layouts.json"))
            .arg(&input)
            .arg("--mode")
            .arg(mode)
            .assert()
            .failure()
            .code(2)
            .stderr(contains("error:").and(contains("hint:")));
    }
}
