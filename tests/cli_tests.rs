//! Tests for the `sqlgate` stdio binary.

use assert_cmd::Command;
use serde_json::{json, Value as JsonValue};
use sqlgate::test_utils::DatabaseFixture;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, fixture: &DatabaseFixture) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let config = format!(
        "[connection]\ndatabase = {:?}\n\n[driver]\nbusy_timeout_ms = 1000\n",
        fixture.path().to_string_lossy()
    );
    fs::write(&path, config).unwrap();
    path
}

fn replies(stdout: &[u8]) -> Vec<JsonValue> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each reply is one JSON line"))
        .collect()
}

#[test]
fn test_list_prints_operation_table() {
    let output = Command::cargo_bin("sqlgate").unwrap().arg("--list").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout.lines().filter_map(|line| line.split('\t').next()).collect();
    assert_eq!(
        names,
        vec![
            "describe_columns",
            "explore_data",
            "help_build_query",
            "insert_query",
            "list_columns",
            "list_tables",
            "list_tables_with_columns",
            "select_query",
            "update_query",
            "use_database_schema",
        ]
    );
}

#[test]
fn test_serves_requests_from_stdin() {
    let fixture = DatabaseFixture::with_sample_data().unwrap();
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &fixture);

    let input = [
        json!({"id": 1, "method": "select_query", "params": {"query": "SELECT id, name FROM Client"}}),
        json!({"id": 2, "method": "insert_query", "params": {"query": "INSERT INTO Client(name) VALUES (?)", "params": ["Carol"]}}),
        json!({"id": 3, "method": "select_query", "params": {"query": "SELECT * FROM Client; DROP TABLE Client"}}),
        json!({"id": 4, "method": "list_tables", "params": {}}),
    ]
    .iter()
    .map(|request| request.to_string())
    .collect::<Vec<_>>()
    .join("\n");

    let output = Command::cargo_bin("sqlgate")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .env_remove("SQLGATE_DATABASE")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let replies = replies(&output.stdout);
    assert_eq!(replies.len(), 4);
    assert_eq!(replies[0], json!({"id": 1, "result": r#"[{"id":1,"name":"Alice"},{"id":2,"name":"Bob"}]"#}));
    assert_eq!(replies[1], json!({"id": 2, "result": "Insert operation completed successfully."}));

    let envelope: JsonValue = serde_json::from_str(replies[2]["result"].as_str().unwrap()).unwrap();
    assert_eq!(envelope["kind"], "internal");
    assert_eq!(replies[3]["result"], r#"["Client","Orders"]"#);

    let count: i64 = fixture
        .connection()
        .query_row("SELECT COUNT(*) FROM Client", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 3);
}

#[test]
fn test_environment_overrides_config_file() {
    let fixture = DatabaseFixture::with_sample_data().unwrap();
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[connection]\ndatabase = \"/nonexistent/other.db\"\n").unwrap();

    let output = Command::cargo_bin("sqlgate")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .env("SQLGATE_DATABASE", fixture.path())
        .write_stdin(r#"{"id": "a", "method": "list_columns", "params": {"table_name": "Client"}}"#)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(replies(&output.stdout), vec![json!({"id": "a", "result": r#"["id","name"]"#})]);
}

#[test]
fn test_missing_parameter_is_reported_as_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[connection]\nhost = \"localhost\"\n").unwrap();

    let output = Command::cargo_bin("sqlgate")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .env("SQLGATE_USER", "")
        .write_stdin(r#"{"id": 9, "method": "list_tables"}"#)
        .output()
        .unwrap();
    assert!(output.status.success());

    let replies = replies(&output.stdout);
    assert_eq!(replies[0]["id"], 9);
    assert!(replies[0]["error"].as_str().unwrap().contains("user"));
}

#[test]
fn test_unreadable_config_fails_startup() {
    Command::cargo_bin("sqlgate")
        .unwrap()
        .arg("--config")
        .arg("/nonexistent/sqlgate.toml")
        .write_stdin("")
        .assert()
        .failure();
}
