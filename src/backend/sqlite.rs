//! In-process SQLite backend.
//!
//! Each call opens its own read-only connection on a blocking thread and
//! drops it before returning, on success and on error alike.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use tracing::debug;

use super::{BackendError, BackendResult, ColumnInfo, Database, QueryRunner, SchemaCatalog};
use crate::result::{CellValue, TabularResult};
use crate::sql::dialect::Dialect;

/// VM instructions between deadline checks.
const PROGRESS_INTERVAL: i32 = 1_000;

/// SQLite database file accessed through rusqlite.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> BackendResult<Connection> {
        debug!(path = %path.display(), "opening sqlite connection");
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    /// Run `f` against a fresh connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> BackendResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> BackendResult<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::open(&path)?;
            f(&conn)
        })
        .await
        .map_err(|e| BackendError::Task(e.to_string()))?
    }
}

fn cell_from_ref(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(n) => CellValue::Integer(n),
        ValueRef::Real(x) => CellValue::Float(x),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Text(format!("<{} bytes>", bytes.len())),
    }
}

fn is_interrupted(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::OperationInterrupted
    )
}

fn read_all(conn: &Connection, sql: &str, timeout: Duration) -> BackendResult<TabularResult> {
    let fail = |e: rusqlite::Error| {
        if is_interrupted(&e) {
            BackendError::Timeout(timeout.as_secs())
        } else {
            BackendError::Sqlite(e)
        }
    };

    let mut stmt = conn.prepare(sql).map_err(fail)?;
    let labels: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = labels.len();
    let mut result = TabularResult::with_unique_columns(labels);

    let mut rows = stmt.query([]).map_err(fail)?;
    while let Some(row) = rows.next().map_err(fail)? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(cell_from_ref(row.get_ref(i).map_err(fail)?));
        }
        result.push_row(values)?;
    }
    Ok(result)
}

#[async_trait]
impl SchemaCatalog for SqliteBackend {
    async fn list_tables(&self) -> BackendResult<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        })
        .await
    }

    async fn list_columns(&self, table: &str) -> BackendResult<Vec<ColumnInfo>> {
        let table = table.to_string();
        self.with_connection(move |conn| {
            let mut stmt =
                conn.prepare("SELECT name, type, \"notnull\" FROM pragma_table_info(?1) ORDER BY cid")?;
            let columns = stmt
                .query_map([&table], |row| {
                    Ok(ColumnInfo {
                        name: row.get(0)?,
                        data_type: row.get(1)?,
                        nullable: row.get::<_, i64>(2)? == 0,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            if columns.is_empty() {
                return Err(BackendError::TableNotFound(table));
            }
            Ok(columns)
        })
        .await
    }
}

#[async_trait]
impl QueryRunner for SqliteBackend {
    async fn run(&self, sql: &str, timeout: Duration) -> BackendResult<TabularResult> {
        let sql = sql.to_string();
        self.with_connection(move |conn| {
            let deadline = Instant::now() + timeout;
            conn.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() > deadline));
            read_all(conn, &sql, timeout)
        })
        .await
    }
}

impl Database for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, SqliteBackend) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE Residents (
                 Id INTEGER PRIMARY KEY,
                 FirstName VARCHAR(50) NOT NULL,
                 Email TEXT,
                 Score REAL
             );
             INSERT INTO Residents VALUES (1, 'Ana', NULL, 2.5);
             INSERT INTO Residents VALUES (2, 'Bo', 'bo@example.org', NULL);",
        )
        .unwrap();
        (dir, SqliteBackend::new(path))
    }

    #[tokio::test]
    async fn test_list_tables_and_columns() {
        let (_dir, backend) = fixture();
        assert_eq!(backend.list_tables().await.unwrap(), vec!["Residents"]);

        let columns = backend.list_columns("Residents").await.unwrap();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[1], ColumnInfo::new("FirstName", "VARCHAR(50)", false));
        assert!(columns[2].nullable);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let (_dir, backend) = fixture();
        let err = backend.list_columns("Nope").await.unwrap_err();
        assert!(matches!(err, BackendError::TableNotFound(t) if t == "Nope"));
    }

    #[tokio::test]
    async fn test_run_preserves_nulls() {
        let (_dir, backend) = fixture();
        let result = backend
            .run(
                "SELECT [Residents].[FirstName], [Residents].[Email], [Residents].[Score] \
                 FROM [Residents] ORDER BY [Residents].[Id] ASC",
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(result.columns(), &["FirstName", "Email", "Score"]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.get(0, "Email"), Some(&CellValue::Null));
        assert_eq!(result.get(0, "Score"), Some(&CellValue::Float(2.5)));
        assert_eq!(result.get(1, "Score"), Some(&CellValue::Null));
    }

    #[tokio::test]
    async fn test_connection_is_read_only() {
        let (_dir, backend) = fixture();
        let err = backend
            .run("DELETE FROM Residents", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Sqlite(_)));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_long_statement() {
        let (_dir, backend) = fixture();
        let sql = "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n) \
                   SELECT count(*) FROM n";
        let err = backend.run(sql, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_duplicate_labels_are_made_unique() {
        let (_dir, backend) = fixture();
        let result = backend
            .run("SELECT Id, Id FROM Residents", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.columns(), &["Id", "Id_2"]);
    }
}
