//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn diarybox_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_diarybox"))
}

/// Run diarybox against `db` with the password supplied on stdin
fn run_diarybox_with_passphrase(
    db: &Path,
    args: &[&str],
    passphrase: &str,
) -> Result<Output, std::io::Error> {
    let mut child = Command::new(diarybox_bin())
        .arg("--passphrase-stdin")
        .arg("--db")
        .arg(db)
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., invalid arguments)
        let _ = stdin.write_all(passphrase.as_bytes());
    }

    child.wait_with_output()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output, what: &str) {
    assert!(output.status.success(), "{} failed: {}", what, stderr(output));
}

fn add(db: &Path, date: &str, title: &str, content: &str, passphrase: &str) -> Output {
    run_diarybox_with_passphrase(
        db,
        &["add", "--date", date, "--title", title, "--content", content],
        passphrase,
    )
    .unwrap()
}

fn list_json(db: &Path, passphrase: &str) -> serde_json::Value {
    let result = run_diarybox_with_passphrase(db, &["list", "--json"], passphrase).unwrap();
    assert_success(&result, "list");
    serde_json::from_str(&stdout(&result)).unwrap()
}

#[test]
fn test_init_creates_database() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("sub").join("diary.db");

    let result = run_diarybox_with_passphrase(&db, &["init"], "").unwrap();
    assert_success(&result, "init");
    assert!(db.exists());
}

#[test]
fn test_add_and_list_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    assert_success(&add(&db, "2025-01-01", "A", "hello", "test"), "add A");
    assert_success(&add(&db, "2025-01-02", "B", "world", "test"), "add B");

    let entries = list_json(&db, "test");
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["title"], "B");
    assert_eq!(entries[0]["content"], "world");
    assert_eq!(entries[1]["title"], "A");
    assert_eq!(entries[1]["content"], "hello");
}

#[test]
fn test_content_is_encrypted_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    assert_success(
        &add(&db, "2025-01-01", "A", "nobody may read this", "test"),
        "add",
    );

    let bytes = fs::read(&db).unwrap();
    let needle = b"nobody may read this";
    assert!(!bytes.windows(needle.len()).any(|w| w == needle));
}

#[test]
fn test_list_with_wrong_passphrase_warns() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    assert_success(&add(&db, "2025-01-01", "A", "hello", "correct"), "add");

    let result = run_diarybox_with_passphrase(&db, &["list", "--json"], "wrong").unwrap();
    assert_success(&result, "list");
    let entries: serde_json::Value = serde_json::from_str(&stdout(&result)).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 0);
    assert!(stderr(&result).contains("is the password correct?"));
}

#[test]
fn test_content_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");
    let content_path = temp_dir.path().join("entry.txt");
    fs::write(&content_path, "line one\nline two").unwrap();

    let result = run_diarybox_with_passphrase(
        &db,
        &[
            "add",
            "--date",
            "2025-03-03",
            "--title",
            "From file",
            "--content-file",
            content_path.to_str().unwrap(),
        ],
        "test",
    )
    .unwrap();
    assert_success(&result, "add");

    let entries = list_json(&db, "test");
    assert_eq!(entries[0]["content"], "line one\nline two");
}

#[test]
fn test_add_without_content_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    let result =
        run_diarybox_with_passphrase(&db, &["add", "--title", "No content"], "test").unwrap();
    assert!(!result.status.success());
}

#[test]
fn test_add_with_empty_title_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    let result = add(&db, "2025-01-01", "  ", "text", "test");
    assert!(!result.status.success());
    assert!(stderr(&result).contains("title must not be empty"));
}

#[test]
fn test_show_entry() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    let result = add(&db, "2025-01-01", "A", "hello there", "test");
    assert_success(&result, "add");
    assert!(stdout(&result).contains("Added entry 1"));

    let result = run_diarybox_with_passphrase(&db, &["show", "1"], "test").unwrap();
    assert_success(&result, "show");
    let out = stdout(&result);
    assert!(out.contains("[1] 2025-01-01  A"));
    assert!(out.contains("    hello there"));
}

#[test]
fn test_update_operation() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    assert_success(&add(&db, "2025-01-01", "A", "Original content", "test"), "add");

    let result = run_diarybox_with_passphrase(
        &db,
        &[
            "update",
            "1",
            "--date",
            "2025-02-02",
            "--title",
            "A2",
            "--content",
            "Updated content",
        ],
        "test",
    )
    .unwrap();
    assert_success(&result, "update");

    let entries = list_json(&db, "test");
    assert_eq!(entries[0]["id"], 1);
    assert_eq!(entries[0]["date"], "2025-02-02");
    assert_eq!(entries[0]["title"], "A2");
    assert_eq!(entries[0]["content"], "Updated content");
}

#[test]
fn test_update_with_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    assert_success(
        &add(&db, "2025-01-01", "A", "Original", "correct_password"),
        "add",
    );

    let result = run_diarybox_with_passphrase(
        &db,
        &[
            "update", "1", "--date", "2025-01-01", "--title", "A", "--content", "Updated",
        ],
        "wrong_password",
    )
    .unwrap();

    assert!(!result.status.success());
    assert!(
        stderr(&result).contains("bad password"),
        "Expected error message about the password, got: {}",
        stderr(&result)
    );

    let entries = list_json(&db, "correct_password");
    assert_eq!(entries[0]["content"], "Original");
}

#[test]
fn test_update_missing_entry_fails() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    let result = run_diarybox_with_passphrase(
        &db,
        &[
            "update", "9", "--date", "2025-01-01", "--title", "A", "--content", "x",
        ],
        "test",
    )
    .unwrap();
    assert!(!result.status.success());
    assert!(stderr(&result).contains("no entry with id 9"));
}

#[test]
fn test_delete_operation() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    assert_success(&add(&db, "2025-01-01", "A", "a", "test"), "add A");
    assert_success(&add(&db, "2025-01-02", "B", "b", "test"), "add B");

    let result = run_diarybox_with_passphrase(&db, &["delete", "1"], "").unwrap();
    assert_success(&result, "delete");

    let entries = list_json(&db, "test");
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["title"], "B");

    let result = run_diarybox_with_passphrase(&db, &["delete", "1"], "").unwrap();
    assert!(!result.status.success());
}

#[test]
fn test_search() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("diary.db");

    assert_success(&add(&db, "2025-01-10", "Ski trip", "snow everywhere", "test"), "add");
    assert_success(&add(&db, "2025-02-10", "Work", "long meeting", "test"), "add");
    assert_success(&add(&db, "2025-03-10", "Spring", "the SNOW melted", "test"), "add");

    let result = run_diarybox_with_passphrase(
        &db,
        &["search", "--keyword", "snow", "--from", "2025-02-01", "--json"],
        "test",
    )
    .unwrap();
    assert_success(&result, "search");

    let entries: serde_json::Value = serde_json::from_str(&stdout(&result)).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["title"], "Spring");
}

#[test]
fn test_config_file_supplies_db_path() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("from-config.db");
    let config_path = temp_dir.path().join("diarybox.toml");
    fs::write(
        &config_path,
        format!("db_path = {:?}\n", db.to_str().unwrap()),
    )
    .unwrap();

    let output = Command::new(diarybox_bin())
        .arg("--config")
        .arg(&config_path)
        .arg("init")
        .output()
        .unwrap();
    assert_success(&output, "init");
    assert!(db.exists());
}

#[test]
fn test_missing_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();

    let output = Command::new(diarybox_bin())
        .arg("--config")
        .arg(temp_dir.path().join("nope.toml"))
        .arg("init")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read config file"));
}
