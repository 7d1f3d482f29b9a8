#![forbid(unsafe_code)]

mod error;
mod requests;

pub use error::StoreError;
pub use requests::*;

use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use todo_core::ids::TodoId;
use todo_core::model::TodoItem;
use todo_core::timestamp::UtcTimestamp;
use tracing::debug;

const DB_FILE: &str = "todos.db";
const SCHEMA_VERSION: i64 = 1;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;

        debug!(path = %db_path.display(), "todo store opened");
        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn create_todo(&mut self, request: CreateTodoRequest) -> Result<TodoItem, StoreError> {
        let tx = self.conn.transaction()?;

        // id, completed and both timestamps come from the schema defaults.
        tx.execute("INSERT INTO todos(body) VALUES (?1)", params![request.body])?;
        let id = tx.last_insert_rowid();

        let todo = todo_by_id(&tx, id)?
            .ok_or(StoreError::InvalidInput("todo row missing after insert"))?;
        tx.commit()?;

        debug!(id, "todo created");
        Ok(todo)
    }

    pub fn get_todo(&self, id: TodoId) -> Result<TodoItem, StoreError> {
        todo_by_id(&self.conn, id.as_i64())?.ok_or(StoreError::NotFound)
    }

    /// Complete snapshot of the table, ordered by ascending id.
    pub fn list_todos(&self) -> Result<Vec<TodoItem>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, body, completed, created_at, updated_at \
             FROM todos \
             ORDER BY id ASC",
        )?;

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(decode_todo(
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            )?);
        }
        Ok(out)
    }

    pub fn update_todo(&mut self, request: UpdateTodoRequest) -> Result<TodoItem, StoreError> {
        if request.body.is_none() && request.completed.is_none() {
            return Err(StoreError::InvalidInput("no fields to update"));
        }

        let id = request.id.as_i64();
        let tx = self.conn.transaction()?;

        let Some(current) = todo_by_id(&tx, id)? else {
            return Err(StoreError::NotFound);
        };

        let body = request.body.unwrap_or_else(|| current.body().to_string());
        let completed = request.completed.unwrap_or(current.completed());

        // Fields and the update stamp move in one statement so readers never
        // observe a half-applied update.
        tx.execute(
            "UPDATE todos SET body=?2, completed=?3, updated_at=CURRENT_TIMESTAMP WHERE id=?1",
            params![id, body, completed],
        )?;

        let todo = todo_by_id(&tx, id)?
            .ok_or(StoreError::InvalidInput("todo row missing after update"))?;
        tx.commit()?;

        debug!(id, "todo updated");
        Ok(todo)
    }

    pub fn delete_todo(&mut self, id: TodoId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute("DELETE FROM todos WHERE id=?1", params![id.as_i64()])?;
        tx.commit()?;

        if deleted == 0 {
            return Err(StoreError::NotFound);
        }

        debug!(id = id.as_i64(), "todo deleted");
        Ok(())
    }
}

fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = ["store_state", "todos"].into_iter().collect();

    if tables.iter().any(|table| !required.contains(table.as_str())) {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
          updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS todos (
          id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
          body TEXT NOT NULL,
          completed BOOLEAN NOT NULL DEFAULT FALSE,
          created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
          updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version) VALUES (1, ?1) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at=CURRENT_TIMESTAMP",
        params![SCHEMA_VERSION],
    )?;

    Ok(())
}

fn todo_by_id(conn: &Connection, id: i64) -> Result<Option<TodoItem>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, body, completed, created_at, updated_at FROM todos WHERE id=?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, body, completed, created_at, updated_at)) => Ok(Some(decode_todo(
            id, body, completed, created_at, updated_at,
        )?)),
        None => Ok(None),
    }
}

fn decode_todo(
    id: i64,
    body: String,
    completed: bool,
    created_at: String,
    updated_at: String,
) -> Result<TodoItem, StoreError> {
    let id = TodoId::try_new(id).map_err(|_| StoreError::InvalidInput("invalid todo row"))?;
    let created_at = UtcTimestamp::parse(&created_at)
        .map_err(|_| StoreError::InvalidInput("invalid todo row"))?;
    let updated_at = UtcTimestamp::parse(&updated_at)
        .map_err(|_| StoreError::InvalidInput("invalid todo row"))?;
    TodoItem::try_new(id, body, completed, created_at, updated_at)
        .map_err(|_| StoreError::InvalidInput("invalid todo row"))
}
