use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn w2x() -> Command {
    Command::cargo_bin("w2x").unwrap()
}

#[test]
fn test_extract_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    w2x()
        .arg("extract")
        .arg(dir.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_extract_garbage_is_unreadable() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("garbage.pdf");
    std::fs::write(&input, b"not a pdf").unwrap();

    w2x()
        .args(["extract", "--no-ocr"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unreadable document"));
}

#[test]
fn test_config_init_then_show() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    w2x()
        .args(["config", "init", "--output"])
        .arg(&config)
        .assert()
        .success();
    assert!(config.exists());

    w2x()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"raster_dpi\": 300"));

    w2x()
        .args(["config", "init", "--output"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_labels_lists_fields() {
    w2x()
        .args(["config", "labels"])
        .assert()
        .success()
        .stdout(predicate::str::contains("box1_wages"))
        .stdout(predicate::str::contains("employer_ein"));
}

#[test]
fn test_batch_without_matches_fails() {
    let dir = TempDir::new().unwrap();
    let pattern = dir.path().join("*.pdf");

    w2x()
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No PDF files match"));
}
