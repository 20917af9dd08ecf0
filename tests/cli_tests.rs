//! Integration tests for CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-extract"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture() -> TempDir {
    let tmp = TempDir::new().expect("tmp");
    fs::create_dir_all(tmp.path().join("pkg")).expect("mkdir");
    fs::write(tmp.path().join("pkg/app.py"), "OldBrand_API_KEY = \"sk-abc123def456ghi789jkl\"\n")
        .expect("write");
    fs::write(tmp.path().join("README.md"), "# OldBrand\n").expect("write");
    tmp
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

#[test]
fn test_cli_version() {
    let mut cmd = cli();
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("repo-extract"));
}

#[test]
fn test_cli_help() {
    let mut cmd = cli();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("plans"))
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_scan_prints_tree() {
    let src = fixture();
    let mut cmd = cli();
    cmd.args(["scan", path_str(src.path())]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Files: 2"))
        .stdout(predicate::str::contains("app.py"));
}

#[test]
fn test_scan_rejects_missing_root() {
    let src = fixture();
    let mut cmd = cli();
    cmd.args(["scan", path_str(&src.path().join("nope"))]);
    cmd.assert().failure().stderr(predicate::str::contains("not a readable directory"));
}

#[test]
fn test_plan_then_apply_from_file() {
    let src = fixture();
    let work = TempDir::new().expect("tmp");
    let dest = work.path().join("out");
    let plan_file = work.path().join("plan.json");

    let mut plan = cli();
    plan.args([
        "plan",
        path_str(src.path()),
        "--dest",
        path_str(&dest),
        "--brand",
        "OldBrand=NewBrand",
        "--out",
        path_str(&plan_file),
        "--diff",
    ]);
    plan.assert()
        .success()
        .stdout(predicate::str::contains("Residual:"))
        .stdout(predicate::str::contains("+NewBrand_API_KEY = \"<REDACTED>\""))
        .stdout(predicate::str::contains("Saved plan to"));
    assert!(plan_file.exists());
    assert!(!dest.exists(), "planning must not write the destination");

    let mut apply = cli();
    apply.args(["apply", "--plan", path_str(&plan_file), "--yes"]);
    apply.assert().success().stdout(predicate::str::contains("Completed: 2 of 2 files written"));

    assert_eq!(
        fs::read_to_string(dest.join("pkg/app.py")).expect("read"),
        "NewBrand_API_KEY = \"<REDACTED>\"\n"
    );
    assert_eq!(fs::read_to_string(dest.join("README.md")).expect("read"), "# NewBrand\n");
}

#[test]
fn test_apply_refuses_non_empty_destination() {
    let src = fixture();
    let dest = TempDir::new().expect("tmp");
    fs::write(dest.path().join("existing.txt"), "keep").expect("write");

    let mut cmd = cli();
    cmd.args(["apply", path_str(src.path()), "--dest", path_str(dest.path()), "--yes"]);
    cmd.assert().failure().stderr(predicate::str::contains("already contains entries"));
    assert_eq!(fs::read_to_string(dest.path().join("existing.txt")).expect("read"), "keep");
}

#[test]
fn test_apply_requires_confirmation_when_not_interactive() {
    let src = fixture();
    let work = TempDir::new().expect("tmp");
    let dest = work.path().join("out");

    let mut cmd = cli();
    cmd.args(["apply", path_str(src.path()), "--dest", path_str(&dest)]).write_stdin("");
    cmd.assert().failure().stderr(predicate::str::contains("--yes"));
    assert!(!dest.exists());
}

#[test]
fn test_apply_streams_json_events_and_writes_changelog() {
    let src = fixture();
    let work = TempDir::new().expect("tmp");
    let dest = work.path().join("out");

    let mut cmd = cli();
    cmd.args([
        "apply",
        path_str(src.path()),
        "pkg",
        "--dest",
        path_str(&dest),
        "--brand",
        "OldBrand=NewBrand",
        "--changelog",
        "--json-events",
        "--yes",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"event\":\"started\""))
        .stdout(predicate::str::contains("\"event\":\"file_completed\""))
        .stdout(predicate::str::contains("\"event\":\"finished\""));

    assert!(dest.join("pkg/app.py").exists());
    assert!(!dest.join("README.md").exists());
    let changelog = fs::read_to_string(dest.join("CHANGELOG.md")).expect("changelog");
    assert!(changelog.contains("OldBrand → NewBrand"));
}

#[test]
fn test_apply_with_recipe_file() {
    let src = fixture();
    fs::write(
        src.path().join("repo-extract.toml"),
        "includes = [\"README.md\"]\n\n[[brand_map]]\nfrom = \"OldBrand\"\nto = \"Nova\"\n",
    )
    .expect("write");
    let work = TempDir::new().expect("tmp");
    let dest = work.path().join("out");

    let mut cmd = cli();
    cmd.args(["apply", path_str(src.path()), "--dest", path_str(&dest), "--yes"]);
    cmd.assert().success();
    assert_eq!(fs::read_to_string(dest.join("README.md")).expect("read"), "# Nova\n");
    assert!(!dest.join("pkg").exists());
}

#[test]
fn test_plans_lists_saved_plans() {
    let src = fixture();
    let work = TempDir::new().expect("tmp");
    let plans_dir = work.path().join("plans");

    let mut plan = cli();
    plan.args([
        "plan",
        path_str(src.path()),
        "--dest",
        path_str(&work.path().join("out")),
        "--out",
        path_str(&plans_dir.join("first.yaml")),
    ]);
    plan.assert().success();

    let mut list = cli();
    list.args(["plans", "--dir", path_str(&plans_dir)]);
    list.assert().success().stdout(predicate::str::contains("first.yaml"));
}

#[test]
fn test_review_reports_on_saved_plan() {
    let src = fixture();
    let work = TempDir::new().expect("tmp");
    let plan_file = work.path().join("plan.json");

    let mut plan = cli();
    plan.args([
        "plan",
        path_str(src.path()),
        "--dest",
        path_str(&work.path().join("out")),
        "--no-scrub",
        "--out",
        path_str(&plan_file),
    ]);
    plan.assert().success();

    let mut review = cli();
    review.args(["review", path_str(&plan_file)]);
    review.assert().success().stdout(predicate::str::contains("enable secret scrubbing"));
}

#[test]
fn test_tools_reports_engines() {
    let mut cmd = cli();
    cmd.args(["tools", "--structural-engine", "template", "--import-engine", "regex"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("structural rewrite: template"))
        .stdout(predicate::str::contains("import fix: regex"));
}

#[test]
fn test_completions_for_bash() {
    let mut cmd = cli();
    cmd.args(["completions", "bash"]);
    cmd.assert().success().stdout(predicate::str::contains("repo-extract"));
}
