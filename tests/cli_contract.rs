use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::tempdir;

fn run_textreel(cwd: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_textreel"))
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("textreel command should run")
}

fn write_sample(dir: &Path) -> String {
    let path = dir.join("story.txt");
    fs::write(
        &path,
        "A first paragraph that wraps into a handful of lines.\n\nAnd a second one.",
    )
    .expect("sample should write");
    "story.txt".to_owned()
}

#[test]
fn check_reports_a_plan() {
    let dir = tempdir().expect("tempdir should create");
    let input = write_sample(dir.path());

    let output = run_textreel(dir.path(), &["check", &input]);
    assert!(output.status.success(), "check should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("OK: story.txt"));
    assert!(stdout.contains("2 slides"));
}

#[test]
fn check_json_is_stable_and_parses() {
    let dir = tempdir().expect("tempdir should create");
    let input = write_sample(dir.path());

    let first = run_textreel(dir.path(), &["check", &input, "--json"]);
    assert!(first.status.success(), "check --json should succeed");

    let second = run_textreel(dir.path(), &["check", &input, "--json"]);
    assert!(second.status.success(), "check --json should succeed");
    assert_eq!(first.stdout, second.stdout, "json output should be stable");

    let parsed: Value = serde_json::from_slice(&first.stdout).expect("json should parse");
    assert_eq!(parsed["frames"].as_u64(), Some(2));
    assert!(parsed["max_lines_per_frame"].as_u64().unwrap_or(0) >= 1);
    assert!(parsed["total_seconds"].as_f64().unwrap_or(0.0) > 0.0);
}

#[test]
fn missing_input_fails_with_message() {
    let dir = tempdir().expect("tempdir should create");

    let output = run_textreel(dir.path(), &["check", "no_such_file.txt"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("input file not found"));
}

#[test]
fn invalid_geometry_is_rejected_before_any_work() {
    let dir = tempdir().expect("tempdir should create");
    let input = write_sample(dir.path());

    let zero = run_textreel(dir.path(), &["check", &input, "--width", "0"]);
    assert!(!zero.status.success());
    assert!(String::from_utf8_lossy(&zero.stderr).contains("resolution must be positive"));

    let odd = run_textreel(dir.path(), &["check", &input, "--width", "1919"]);
    assert!(!odd.status.success());
    assert!(String::from_utf8_lossy(&odd.stderr).contains("even"));

    // Build must fail the same way without touching the output path.
    let build = run_textreel(
        dir.path(),
        &["build", &input, "-o", "out.mp4", "--width", "0"],
    );
    assert!(!build.status.success());
    assert!(!dir.path().join("out.mp4").exists());
}

#[test]
fn bad_color_is_a_usage_error() {
    let dir = tempdir().expect("tempdir should create");
    let input = write_sample(dir.path());

    let output = run_textreel(
        dir.path(),
        &["check", &input, "--text-color", "not-a-color"],
    );
    assert!(!output.status.success());
}
