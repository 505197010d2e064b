use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
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

fn run_interactive(input: &str) -> Output {
    let store_path = temp_path("cli-interactive.db");

    let mut child = Command::new(env!("CARGO_BIN_EXE_todolist"))
        .env("TODOLIST_DB_PATH", &store_path)
        .env("TODOLIST_CONFIG_PATH", temp_path("missing-config.json"))
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    let output = child
        .wait_with_output()
        .expect("failed to read interactive output");

    remove_store(&store_path);
    output
}

#[test]
fn interactive_help_shows_usage() {
    let output = run_interactive("help\nexit\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage") || stdout.contains("USAGE"));
}

#[test]
fn interactive_invalid_command_prints_error_and_continues() {
    let output = run_interactive("nope\nadd \"still works\"\nexit\n");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_input"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Added item: still works (1)"));
}

#[test]
fn interactive_draft_flow_saves_item() {
    let output = run_interactive(
        "new\n\
         set-title \"Buy groceries\"\n\
         set-description \"Milk and eggs\"\n\
         set-due \"2025-12-24 18:00\"\n\
         draft\n\
         save\n\
         show 1 --json\n\
         exit\n",
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Title: Buy groceries"));
    assert!(stdout.contains("Due: 2025-12-24 18:00"));
    assert!(stdout.contains("Added item: Buy groceries (1)"));
    assert!(stdout.contains("\"description\":\"Milk and eggs\""));
}

#[test]
fn interactive_draft_commands_require_new() {
    let output = run_interactive("set-title orphan\nsave\nexit\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("no item is being composed").count(), 2);
}

#[test]
fn interactive_save_requires_title() {
    let output = run_interactive("new\nset-description orphan\nsave\nlist --json\nexit\n");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("title is required"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("[]"));
}

#[test]
fn interactive_cancel_discards_draft() {
    let output = run_interactive("new\nset-title \"half typed\"\ncancel\ndraft\nlist --json\nexit\n");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Draft discarded."));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no item is being composed"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("[]"));
}

#[test]
fn interactive_rejects_config_overrides() {
    let output = run_interactive("list --config-override theme=noir\nexit\n");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("only accepted at startup"));
}

#[test]
fn interactive_sort_choice_applies_to_later_lists() {
    let output = run_interactive(
        "add b\nadd a\nsort created\nlist --json\nsort title\nlist --json\nexit\n",
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lists: Vec<Vec<serde_json::Value>> = stdout
        .lines()
        .filter(|line| line.starts_with('['))
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let titles = |items: &[serde_json::Value]| -> Vec<String> {
        items
            .iter()
            .map(|item| item["title"].as_str().unwrap().to_string())
            .collect()
    };

    assert_eq!(lists.len(), 2);
    assert_eq!(titles(&lists[0]), vec!["b", "a"]);
    assert_eq!(titles(&lists[1]), vec!["a", "b"]);
}
