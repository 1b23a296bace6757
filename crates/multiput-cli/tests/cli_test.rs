//! Command-line behaviour that needs no reachable bucket

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A `multiput` command isolated from the user's config and AWS files
fn multiput(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("multiput").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("AWS_CONFIG_FILE", home.path().join("aws-config"))
        .env("AWS_SHARED_CREDENTIALS_FILE", home.path().join("aws-credentials"))
        .env("AWS_EC2_METADATA_DISABLED", "true")
        .env_remove("AWS_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    multiput(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_upload_help_shows_options() {
    let home = TempDir::new().unwrap();
    multiput(&home)
        .args(["upload", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--parallel"))
        .stdout(predicate::str::contains("--file-key"))
        .stdout(predicate::str::contains("--profile"))
        .stdout(predicate::str::contains("[CHUNKS]"));
}

#[test]
fn test_upload_requires_bucket() {
    let home = TempDir::new().unwrap();
    multiput(&home)
        .args(["upload", "source.bin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<BUCKET>"));
}

#[test]
fn test_upload_missing_source_is_io_error() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("absent.bin");

    multiput(&home)
        .arg("upload")
        .arg(&missing)
        .args(["bucket", "4", "--endpoint", "http://127.0.0.1:1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("stat"));
}

#[test]
fn test_quiet_upload_failure_still_reports_error() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("absent.bin");

    multiput(&home)
        .arg("-q")
        .arg("upload")
        .arg(&missing)
        .args(["bucket", "4", "--endpoint", "http://127.0.0.1:1"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("stat"))
        .stderr(predicate::str::contains("DEBUG").not())
        .stderr(predicate::str::contains("INFO").not());
}

#[test]
fn test_quiet_config_error_still_reported() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("config").join("multiput");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "[aws]\nregion = 3\n").unwrap();

    multiput(&home)
        .args(["-q", "status", "bucket", "user", "app", "file"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_upload_more_chunks_than_bytes_is_invalid() {
    let home = TempDir::new().unwrap();
    let source = home.path().join("tiny.bin");
    fs::write(&source, b"abc").unwrap();

    multiput(&home)
        .arg("upload")
        .arg(&source)
        .args(["bucket", "4", "--endpoint", "http://127.0.0.1:1"])
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_upload_zero_parallelism_is_invalid() {
    let home = TempDir::new().unwrap();
    let source = home.path().join("source.bin");
    fs::write(&source, vec![7u8; 64]).unwrap();

    multiput(&home)
        .arg("upload")
        .arg(&source)
        .args(["bucket", "4", "--parallel", "0", "--endpoint", "http://127.0.0.1:1"])
        .assert()
        .code(3);
}

#[test]
fn test_config_path_is_under_config_dir() {
    let home = TempDir::new().unwrap();
    multiput(&home)
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("multiput"))
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();
    multiput(&home).args(["config", "--init"]).assert().success();

    let written = home
        .path()
        .join("config")
        .join("multiput")
        .join("config.toml");
    assert!(written.exists());

    multiput(&home)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chunks = 10"))
        .stdout(predicate::str::contains("eu-west-3"));
}

#[test]
fn test_config_init_keeps_existing_file() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("config").join("multiput");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "[upload]\nchunks = 3\n").unwrap();

    multiput(&home).args(["config", "--init"]).assert().success();
    assert_eq!(
        fs::read_to_string(dir.join("config.toml")).unwrap(),
        "[upload]\nchunks = 3\n"
    );
}

#[test]
fn test_malformed_config_fails_upload() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("config").join("multiput");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "[upload]\nchunks = \"many\"\n").unwrap();

    multiput(&home)
        .args(["upload", "source.bin", "bucket"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_status_requires_all_key_segments() {
    let home = TempDir::new().unwrap();
    multiput(&home)
        .args(["status", "bucket", "user", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<FILE_KEY>"));
}
