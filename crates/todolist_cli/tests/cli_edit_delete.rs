use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("todolist-{nanos}-{file_name}"))
}

fn remove_store(path: &Path) {
    std::fs::remove_file(path).ok();
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        std::fs::remove_file(PathBuf::from(sidecar)).ok();
    }
}

fn run(store_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_todolist"))
        .args(args)
        .env("TODOLIST_DB_PATH", store_path)
        .env("TODOLIST_CONFIG_PATH", temp_path("missing-config.json"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run todolist")
}

fn show_json(store_path: &Path, id: &str) -> serde_json::Value {
    let output = run(store_path, &["show", id, "--json"]);
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn show_command_prints_details() {
    let store_path = temp_path("cli-show.db");
    run(&store_path, &["add", "Buy groceries"]);

    let output = run(&store_path, &["show", "1"]);
    remove_store(&store_path);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ID: 1"));
    assert!(stdout.contains("Title: Buy groceries"));
    assert!(stdout.contains("Description: No description"));
    assert!(stdout.contains("Due: Not set"));
}

#[test]
fn show_missing_item_is_not_found() {
    let store_path = temp_path("cli-show-missing.db");

    let output = run(&store_path, &["show", "42"]);
    remove_store(&store_path);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: record_not_found"));
}

#[test]
fn edit_command_updates_title_and_keeps_creation_date() {
    let store_path = temp_path("cli-edit.db");
    run(&store_path, &["add", "Buy groceries", "-d", "Milk"]);
    let before = show_json(&store_path, "1");

    let output = run(&store_path, &["edit", "1", "--title", "Buy new PC"]);
    let after = show_json(&store_path, "1");
    remove_store(&store_path);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Updated item: Buy new PC (1)"));
    assert_eq!(after["title"], "Buy new PC");
    assert_eq!(after["description"], "Milk");
    assert_eq!(after["created_on"], before["created_on"]);
}

#[test]
fn edit_command_sets_and_clears_due_date() {
    let store_path = temp_path("cli-edit-due.db");
    run(&store_path, &["add", "demo"]);

    let set = run(&store_path, &["edit", "1", "--due", "2025-06-01T08:00:00Z"]);
    let with_due = show_json(&store_path, "1");
    let cleared = run(&store_path, &["edit", "1", "--clear-due"]);
    let without_due = show_json(&store_path, "1");
    remove_store(&store_path);

    assert!(set.status.success());
    assert_eq!(with_due["due_date"], "2025-06-01T08:00:00Z");
    assert!(cleared.status.success());
    assert!(without_due["due_date"].is_null());
}

#[test]
fn edit_command_requires_a_change() {
    let store_path = temp_path("cli-edit-noop.db");
    run(&store_path, &["add", "demo"]);

    let output = run(&store_path, &["edit", "1"]);
    let blank = run(&store_path, &["edit", "1", "--title", " "]);
    remove_store(&store_path);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nothing to change"));
    assert!(!blank.status.success());
    assert!(String::from_utf8_lossy(&blank.stderr).contains("title is required"));
}

#[test]
fn edit_missing_item_is_not_found() {
    let store_path = temp_path("cli-edit-missing.db");

    let output = run(&store_path, &["edit", "7", "--title", "ghost"]);
    remove_store(&store_path);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: record_not_found"));
}

#[test]
fn delete_command_removes_item() {
    let store_path = temp_path("cli-delete.db");
    run(&store_path, &["add", "keep"]);
    run(&store_path, &["add", "drop"]);

    let output = run(&store_path, &["delete", "2"]);
    let listed = run(&store_path, &["list", "--json"]);
    remove_store(&store_path);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Deleted item: drop (2)"));
    let items: Vec<serde_json::Value> = serde_json::from_slice(&listed.stdout).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "keep");
}

#[test]
fn delete_missing_item_is_not_found() {
    let store_path = temp_path("cli-delete-missing.db");

    let output = run(&store_path, &["delete", "3"]);
    remove_store(&store_path);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: record_not_found"));
}
