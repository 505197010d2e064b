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

fn titles(output: &Output) -> Vec<String> {
    assert!(output.status.success());
    let items: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    items
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}

fn seed(store_path: &Path) {
    for args in [
        ["add", "b", "--due", "2025-03-01"],
        ["add", "a", "--due", "2025-01-01"],
        ["add", "c", "--due", "2025-02-01"],
    ] {
        assert!(run(store_path, &args).status.success());
    }
    assert!(run(store_path, &["add", "B"]).status.success());
}

#[test]
fn list_empty_store_prints_placeholder() {
    let store_path = temp_path("cli-list-empty.db");

    let output = run(&store_path, &["list"]);
    remove_store(&store_path);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No items."));
}

#[test]
fn list_sorts_by_title_by_default() {
    let store_path = temp_path("cli-list-title.db");
    seed(&store_path);

    let output = run(&store_path, &["list", "--json"]);
    remove_store(&store_path);

    assert_eq!(titles(&output), vec!["B", "a", "b", "c"]);
}

#[test]
fn list_sorts_by_due_date_with_unset_first() {
    let store_path = temp_path("cli-list-due.db");
    seed(&store_path);

    let output = run(&store_path, &["list", "--sort", "due", "--json"]);
    remove_store(&store_path);

    assert_eq!(titles(&output), vec!["B", "a", "c", "b"]);
}

#[test]
fn list_sorts_by_creation_date_then_id() {
    let store_path = temp_path("cli-list-created.db");
    seed(&store_path);

    let output = run(&store_path, &["sort", "created", "--json"]);
    remove_store(&store_path);

    assert_eq!(titles(&output), vec!["b", "a", "c", "B"]);
}

#[test]
fn config_override_sets_default_sort() {
    let store_path = temp_path("cli-list-override.db");
    seed(&store_path);

    let output = run(
        &store_path,
        &["list", "--json", "--config-override", "sort=due"],
    );
    remove_store(&store_path);

    assert_eq!(titles(&output), vec!["B", "a", "c", "b"]);
}

#[test]
fn list_table_shows_columns() {
    let store_path = temp_path("cli-list-table.db");
    assert!(
        run(&store_path, &["add", "Buy groceries", "--due", "2025-12-24 18:00"])
            .status
            .success()
    );

    let output = run(&store_path, &["list"]);
    remove_store(&store_path);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ID"));
    assert!(stdout.contains("Title"));
    assert!(stdout.contains("Buy groceries"));
    assert!(stdout.contains("2025-12-24 18:00"));
}

#[test]
fn list_rejects_unknown_sort_order() {
    let store_path = temp_path("cli-list-bad-sort.db");

    let output = run(&store_path, &["list", "--sort", "priority"]);
    remove_store(&store_path);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_input"));
}

#[test]
fn database_override_wins_over_environment() {
    let env_path = temp_path("cli-list-env.db");
    let flag_path = temp_path("cli-list-flag.db");
    let flag = format!("db={}", flag_path.display());

    let added = run(&env_path, &["add", "flagged", "--config-override", &flag]);
    let env_items = run(&env_path, &["list", "--json"]);
    let flag_items = run(&flag_path, &["list", "--json"]);
    remove_store(&env_path);
    remove_store(&flag_path);

    assert!(added.status.success());
    assert_eq!(titles(&env_items), Vec::<String>::new());
    assert_eq!(titles(&flag_items), vec!["flagged"]);
}
