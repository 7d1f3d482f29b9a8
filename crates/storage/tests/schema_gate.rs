#![forbid(unsafe_code)]

use rusqlite::Connection;
use std::path::PathBuf;
use todo_storage::{CreateTodoRequest, SqliteStore, StoreError};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("todo_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn open_is_fail_closed_on_foreign_schema() {
    let dir = temp_dir("open_is_fail_closed_on_foreign_schema");
    let db_path = dir.join("todos.db");

    let conn = Connection::open(db_path).expect("foreign db must open");
    conn.execute("CREATE TABLE notes(id TEXT PRIMARY KEY)", [])
        .expect("foreign table should be created");
    drop(conn);

    let err = SqliteStore::open(&dir).expect_err("foreign schema must be rejected");
    assert!(matches!(
        err,
        StoreError::InvalidInput(message) if message.starts_with("RESET_REQUIRED")
    ));
}

#[test]
fn open_is_fail_closed_on_schema_version_mismatch() {
    let dir = temp_dir("open_is_fail_closed_on_schema_version_mismatch");

    {
        let _store = SqliteStore::open(&dir).expect("open store");
    }

    {
        let conn = Connection::open(dir.join("todos.db")).expect("open db");
        conn.execute("UPDATE store_state SET schema_version=999 WHERE singleton=1", [])
            .expect("rewrite schema version");
    }

    let err = SqliteStore::open(&dir).expect_err("version mismatch must be rejected");
    assert!(matches!(
        err,
        StoreError::InvalidInput(message) if message.starts_with("RESET_REQUIRED")
    ));
}

#[test]
fn reopen_after_use_passes_the_gate() {
    let dir = temp_dir("reopen_after_use_passes_the_gate");

    let created = {
        let mut store = SqliteStore::open(&dir).expect("open store");
        store
            .create_todo(CreateTodoRequest {
                body: "persisted".to_string(),
            })
            .expect("create todo")
    };

    // AUTOINCREMENT leaves sqlite_sequence behind; the gate must ignore it.
    let store = SqliteStore::open(&dir).expect("reopen store");
    let fetched = store.get_todo(created.id()).expect("get todo after reopen");
    assert_eq!(fetched, created);
}
