//! Integration tests for the `relsync` CLI.
//!
//! Each test creates a temp project with `relsync init`, runs `relsync` as a
//! subprocess, and verifies stdout and/or the workbook file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use pretty_assertions::assert_eq;
use relsync::io::lock::WorkbookLock;
use relsync::io::workbook_io::load_workbook;
use relsync::model::workbook::Workbook;

/// Get the path to the built `relsync` binary.
fn relsync_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("relsync");
    path
}

/// Run `relsync` with the given args in the given directory, returning (stdout, stderr, success).
fn run(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(relsync_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run relsync");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `relsync` expecting success, return stdout.
fn run_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run(dir, args);
    if !success {
        panic!(
            "relsync {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `relsync` expecting failure, return stderr.
fn run_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run(dir, args);
    if success {
        panic!("relsync {:?} unexpectedly succeeded:\nstdout: {}", args, stdout);
    }
    stderr
}

/// Run `relsync` feeding `input` on stdin.
fn run_with_stdin(dir: &Path, args: &[&str], input: &str) -> String {
    let mut child = Command::new(relsync_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run relsync");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(
        output.status.success(),
        "relsync {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn init_project() -> tempfile::TempDir {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ok(tmp.path(), &["init", "--name", "Test Release"]);
    run_ok(
        tmp.path(),
        &["config", "set", "links.base_url", "https://jira.example.com/browse/"],
    );
    tmp
}

fn workbook(dir: &Path) -> Workbook {
    load_workbook(&dir.join("workbook.json")).unwrap()
}

fn tab_names(dir: &Path) -> Vec<String> {
    workbook(dir).names()
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// init / tabs / config
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_config_and_workbook() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["init", "--name", "Spring"]);
    assert!(out.contains("Initialized relsync: Spring"));

    let config = fs::read_to_string(tmp.path().join("relsync.toml")).unwrap();
    assert!(config.starts_with("# Spring"));
    assert_eq!(tab_names(tmp.path()), vec!["Next", "Template"]);

    let out = run_ok(tmp.path(), &["tabs"]);
    assert_eq!(out, "* Next\n  Template\n");
}

#[test]
fn test_init_twice_requires_force() {
    let tmp = init_project();
    let err = run_err(tmp.path(), &["init"]);
    assert!(err.contains("already exists"));
    run_ok(tmp.path(), &["init", "--force"]);
}

#[test]
fn test_missing_config_points_at_init() {
    let tmp = tempfile::TempDir::new().unwrap();
    let err = run_err(tmp.path(), &["tabs"]);
    assert!(err.contains("relsync init"));
}

#[test]
fn test_config_get_and_set() {
    let tmp = init_project();
    run_ok(tmp.path(), &["config", "set", "keys.prefixes", "ADV, OPS"]);
    assert_eq!(run_ok(tmp.path(), &["config", "get", "keys.prefixes"]), "ADV,OPS\n");
    assert_eq!(
        run_ok(tmp.path(), &["config", "get", "sheet.active_tab"]),
        "Next\n"
    );
    // Comments survive the edit
    let config = fs::read_to_string(tmp.path().join("relsync.toml")).unwrap();
    assert!(config.contains("# Syncing this environment archives the active tab"));

    run_err(tmp.path(), &["config", "get", "rotation.carry_from"]);
    run_err(tmp.path(), &["config", "set", "nodot", "x"]);
}

#[test]
fn test_project_dir_flag() {
    let tmp = init_project();
    let elsewhere = tempfile::TempDir::new().unwrap();
    let dir = tmp.path().to_str().unwrap();
    let out = run_ok(elsewhere.path(), &["-C", dir, "tabs"]);
    assert!(out.contains("* Next"));
}

#[test]
fn test_discovers_config_from_subdirectory() {
    let tmp = init_project();
    let sub = tmp.path().join("notes/deep");
    fs::create_dir_all(&sub).unwrap();
    run_ok(&sub, &["sync", "--env", "dev", "--issue", "ADV-1"]);
    assert_eq!(workbook(tmp.path()).tab("Next").unwrap().rows.len(), 2);
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

#[test]
fn test_sync_inserts_new_issue_row() {
    let tmp = init_project();
    let out = run_ok(
        tmp.path(),
        &["sync", "--env", "stage", "--app", "web", "--author", "ana", "--issue", "ADV-5"],
    );
    assert!(out.contains("synced Next: 1 inserted, 0 updated"));

    let book = workbook(tmp.path());
    let rows = &book.tab("Next").unwrap().rows;
    assert_eq!(
        rows[1],
        row(&[
            r#"=HYPERLINK("https://jira.example.com/browse/ADV-5","ADV-5")"#,
            "Pending",
            "ana",
            "Stage",
            "Web",
        ])
    );
    // Lock file stays behind, unlocked
    let book_path = tmp.path().join("workbook.json");
    assert!(tmp.path().join("workbook.json.lock").exists());
    assert!(WorkbookLock::acquire(&book_path, Duration::from_millis(50)).is_ok());
}

#[test]
fn test_sync_twice_only_updates() {
    let tmp = init_project();
    let args = ["sync", "--env", "qa", "--issue", "ADV-1", "ADV-2", "--json"];
    let first: serde_json::Value = serde_json::from_str(&run_ok(tmp.path(), &args)).unwrap();
    assert_eq!(first["inserted"], 2);
    let before = workbook(tmp.path());

    let second: serde_json::Value = serde_json::from_str(&run_ok(tmp.path(), &args)).unwrap();
    assert_eq!(second["inserted"], 0);
    assert_eq!(second["updated"], 2);
    assert_eq!(second["writes"][0]["row"], first["writes"][0]["row"]);
    assert_eq!(second["writes"][1]["range"], "D3");
    assert_eq!(workbook(tmp.path()), before);
}

#[test]
fn test_update_preserves_collaborator_columns() {
    let tmp = init_project();
    run_ok(tmp.path(), &["sync", "--env", "dev", "--issue", "ADV-1"]);

    let mut book = workbook(tmp.path());
    let next = book.tab_mut("Next").unwrap();
    next.set_cell(1, 2, "In QA".to_string());
    next.set_cell(5, 2, "ship it".to_string());
    fs::write(
        tmp.path().join("workbook.json"),
        serde_json::to_string_pretty(&book).unwrap(),
    )
    .unwrap();

    run_ok(tmp.path(), &["sync", "--env", "stage", "--issue", "adv-1"]);
    let book = workbook(tmp.path());
    let r = &book.tab("Next").unwrap().rows[1];
    assert_eq!(r[1], "In QA");
    assert_eq!(r[3], "Stage");
    assert_eq!(r[5], "ship it");
}

#[test]
fn test_sync_text_from_stdin() {
    let tmp = init_project();
    let log = "ADV-7 fix login\nMerge branch 'ADV-8-cache'\nrefs adv-7\n";
    let out = run_with_stdin(tmp.path(), &["sync", "--env", "dev", "--text", "-"], log);
    assert!(out.contains("2 inserted"));
    let book = workbook(tmp.path());
    let rows = &book.tab("Next").unwrap().rows;
    assert!(rows[1][0].ends_with(r#""ADV-7")"#));
    assert!(rows[2][0].ends_with(r#""ADV-8")"#));
}

#[test]
fn test_sync_records_file() {
    let tmp = init_project();
    fs::write(
        tmp.path().join("records.json"),
        r#"[
  {"issueKey": "ADV-20", "author": "bo", "app": "ios"},
  {"issueKey": "garbage"},
  {"issueKey": "ADV-21", "environment": "qa"}
]"#,
    )
    .unwrap();
    let (stdout, stderr, ok) = run(
        tmp.path(),
        &["sync", "--env", "stage", "--app", "web", "--records", "records.json"],
    );
    assert!(ok, "{}", stderr);
    assert!(stdout.contains("2 inserted"));
    assert!(stderr.contains("garbage"));

    let book = workbook(tmp.path());
    let rows = &book.tab("Next").unwrap().rows;
    assert_eq!(&rows[1][2..5], &row(&["bo", "Stage", "iOS"])[..]);
    assert_eq!(&rows[2][3..5], &row(&["QA", "Web"])[..]);
}

#[test]
fn test_configured_prefixes_filter_keys() {
    let tmp = init_project();
    run_ok(tmp.path(), &["config", "set", "keys.prefixes", "ADV"]);
    let out = run_ok(tmp.path(), &["sync", "--env", "dev", "--issue", "ADV-1", "OPS-2"]);
    assert!(out.contains("1 inserted"));
}

#[test]
fn test_dry_run_leaves_workbook_untouched() {
    let tmp = init_project();
    let before = fs::read_to_string(tmp.path().join("workbook.json")).unwrap();
    let out = run_ok(
        tmp.path(),
        &["sync", "--env", "production", "--issue", "ADV-1", "--dry-run", "--date", "2026-02-16"],
    );
    assert!(out.contains("would sync Next: 1 inserted"));
    assert!(out.contains("+ ADV-1  A2:E2"));
    assert!(out.contains("would archive as \"2026-02-16\""));
    let after = fs::read_to_string(tmp.path().join("workbook.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_log_level_flag_enables_engine_logs() {
    let tmp = init_project();
    let (_, stderr, ok) = run(
        tmp.path(),
        &["sync", "--env", "dev", "--issue", "ADV-1", "--log-level", "info"],
    );
    assert!(ok);
    assert!(stderr.contains("synced records"));

    let (_, stderr, _) = run(tmp.path(), &["sync", "--env", "dev", "--issue", "ADV-1"]);
    assert!(!stderr.contains("synced records"));
}

// ---------------------------------------------------------------------------
// rotation
// ---------------------------------------------------------------------------

#[test]
fn test_production_sync_rotates() {
    let tmp = init_project();
    run_ok(tmp.path(), &["sync", "--env", "stage", "--issue", "ADV-1"]);
    let out = run_ok(
        tmp.path(),
        &["sync", "--env", "production", "--issue", "ADV-1", "--date", "2026-02-16"],
    );
    assert!(out.contains("0 inserted, 1 updated"));
    assert!(out.contains("archived as \"2026-02-16\""));

    assert_eq!(tab_names(tmp.path()), vec!["Next", "2026-02-16", "Template"]);
    let book = workbook(tmp.path());
    assert_eq!(book.tab("2026-02-16").unwrap().rows[1][3], "Production");
    assert_eq!(
        book.tab("Next").unwrap().rows,
        book.tab("Template").unwrap().rows
    );
}

#[test]
fn test_same_day_rotation_gets_suffix() {
    let tmp = init_project();
    for _ in 0..2 {
        run_ok(
            tmp.path(),
            &["sync", "--env", "production", "--issue", "ADV-1", "--date", "2026-02-16"],
        );
    }
    let names = tab_names(tmp.path());
    assert_eq!(names, vec!["Next", "2026-02-16 (2)", "2026-02-16", "Template"]);
    assert_eq!(names.iter().filter(|n| *n == "Next").count(), 1);
}

#[test]
fn test_no_rotate_flag() {
    let tmp = init_project();
    run_ok(
        tmp.path(),
        &["sync", "--env", "production", "--issue", "ADV-1", "--no-rotate"],
    );
    assert_eq!(tab_names(tmp.path()), vec!["Next", "Template"]);
}

#[test]
fn test_rotate_command_carries_value() {
    let tmp = init_project();
    run_ok(tmp.path(), &["config", "set", "rotation.carry_from", "K1"]);
    let mut book = workbook(tmp.path());
    book.tab_mut("Next").unwrap().set_cell(10, 1, "4.2.0".to_string());
    fs::write(
        tmp.path().join("workbook.json"),
        serde_json::to_string(&book).unwrap(),
    )
    .unwrap();

    let out = run_ok(tmp.path(), &["rotate", "--date", "2026-03-01", "--json"]);
    let outcome: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(outcome["archive_name"], "2026-03-01");
    assert_eq!(outcome["active"]["index"], 0);
    assert_eq!(outcome["carried"], "4.2.0");

    let book = workbook(tmp.path());
    assert_eq!(book.tab("Next").unwrap().cell(10, 1), Some("4.2.0"));
    assert_eq!(book.tab("Template").unwrap().cell(10, 1), None);
}

#[test]
fn test_missing_template_aborts_before_writing() {
    let tmp = init_project();
    let mut book = workbook(tmp.path());
    book.tabs.retain(|t| t.name != "Template");
    fs::write(
        tmp.path().join("workbook.json"),
        serde_json::to_string(&book).unwrap(),
    )
    .unwrap();

    let err = run_err(tmp.path(), &["sync", "--env", "production", "--issue", "ADV-1"]);
    assert!(err.contains("\"Template\""));
    assert_eq!(workbook(tmp.path()), book);

    // Non-terminal runs do not need the template
    run_ok(tmp.path(), &["sync", "--env", "dev", "--issue", "ADV-1"]);
}

// ---------------------------------------------------------------------------
// index / keys / recovery
// ---------------------------------------------------------------------------

#[test]
fn test_index_reports_rows() {
    let tmp = init_project();
    run_ok(tmp.path(), &["sync", "--env", "dev", "--issue", "ADV-3", "ADV-4"]);
    let out = run_ok(tmp.path(), &["index", "--json"]);
    let index: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(index["tab"], "Next");
    assert_eq!(index["header_row"], 1);
    assert_eq!(index["next_insert_row"], 4);
    assert_eq!(index["keys"][0]["key"], "ADV-3");
    assert_eq!(index["keys"][1]["row"], 3);

    let out = run_ok(tmp.path(), &["index"]);
    assert!(out.starts_with("Next: 2 keys, header row 1, next insert row 4"));
}

#[test]
fn test_keys_outside_project() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(
        tmp.path(),
        &["keys", r#"fixes ADV-1, see =HYPERLINK("https://x/OPS-9","ADV-2") and adv-1"#],
    );
    assert_eq!(out, "ADV-1\nADV-2\n");

    let out = run_with_stdin(tmp.path(), &["keys", "--json"], "WEB-12 and nothing else");
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["keys"], serde_json::json!(["WEB-12"]));
}

#[test]
fn test_recovery_log_listing() {
    let tmp = init_project();
    assert_eq!(run_ok(tmp.path(), &["recovery"]), "no recovery entries\n");

    for step in ["one", "two", "three"] {
        relsync::io::recovery::log_recovery(
            tmp.path(),
            relsync::io::recovery::RecoveryEntry {
                timestamp: chrono::Utc::now(),
                category: relsync::io::recovery::RecoveryCategory::Write,
                description: format!("sync stopped ({})", step),
                fields: vec![("Tab".to_string(), "Next".to_string())],
                body: "~ ADV-1  D2 <- Production".to_string(),
            },
        );
    }

    let out = run_ok(tmp.path(), &["recovery", "--tail", "2"]);
    assert!(!out.contains("(one)"));
    assert!(out.contains("(two)"));
    assert!(out.contains("(three)"));
    assert!(out.contains("D2 <- Production"));

    let json: serde_json::Value =
        serde_json::from_str(&run_ok(tmp.path(), &["recovery", "--json"])).unwrap();
    assert_eq!(json["entries"].as_array().unwrap().len(), 3);
}
