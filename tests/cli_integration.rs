use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("hello.py"), "# hello world\ndef search(): pass\n").unwrap();
    fs::write(root.join("readme.md"), "# Readme\n").unwrap();
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("sub/deep.txt"), "deep file content with search keyword\n").unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join(".git/config"), "[core]\n").unwrap();
    dir
}

fn qry() -> Command {
    let mut cmd = Command::cargo_bin("qry").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_filename_search_prints_matches() {
    let dir = sample_tree();
    qry()
        .arg("hello")
        .arg("--path")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hello.py"))
        .stdout(predicate::str::contains("readme.md").not())
        .stderr(predicate::str::contains("Found"));
}

#[test]
fn test_content_search_with_snippet() {
    let dir = sample_tree();
    qry()
        .args(["search", "keyword", "--mode", "content", "--snippet", "-p"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("deep.txt"))
        .stdout(predicate::str::contains(">    1 | deep file content"));
}

#[test]
fn test_ndjson_output() {
    let dir = sample_tree();
    let output = qry()
        .args(["--type", "py,md", "--output", "ndjson", "-p"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|v| v["score"] == 1.0));
}

#[test]
fn test_json_document_and_limit() {
    let dir = sample_tree();
    let output = qry()
        .args(["--output", "json", "--limit", "1", "-p"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["total"], 1);
    assert_eq!(doc["interrupted"], false);
}

#[test]
fn test_no_exclude_reaches_git_dir() {
    let dir = sample_tree();
    qry()
        .args(["config", "-p"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    qry()
        .args(["config", "--no-exclude", "-p"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_size_flags() {
    let dir = sample_tree();
    qry()
        .args(["--min-size", "1k", "-p"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("No files found"));

    qry()
        .args(["--min-size", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid size"));
}

#[test]
fn test_priority_strategy_runs() {
    let dir = sample_tree();
    qry()
        .args(["deep", "--strategy", "priority", "-p"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("deep.txt"));
}

#[test]
fn test_config_file_sets_default_mode() {
    let dir = sample_tree();
    let config = dir.path().join("qry.toml");
    fs::write(&config, "[search]\ndefault_mode = \"content\"\n").unwrap();

    qry()
        .args(["def search", "--config"])
        .arg(&config)
        .arg("-p")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("hello.py"));
}

#[test]
fn test_metrics_flag() {
    let dir = sample_tree();
    qry()
        .args(["hello", "--metrics", "-p"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("files_scanned"));
}

#[test]
fn test_completions() {
    qry()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("qry"));
}

#[test]
fn test_init_config_writes_loadable_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conf/qry.toml");

    qry().arg("init-config").arg(&path).assert().success();
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[search]"));
    assert!(written.contains("[engine]"));

    qry().arg("init-config").arg(&path).assert().failure();
    qry()
        .arg("init-config")
        .arg(&path)
        .arg("--force")
        .assert()
        .success();

    qry()
        .args(["readme", "--config"])
        .arg(&path)
        .arg("-p")
        .arg(sample_tree().path())
        .assert()
        .success();
}
