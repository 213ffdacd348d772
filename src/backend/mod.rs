//! Database backends: schema catalog and statement execution.
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │        SchemaCatalog         │   │         QueryRunner          │
//! │  - list_tables()             │   │  - run(sql, timeout)         │
//! │  - list_columns(table)       │   │    -> TabularResult          │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                └───────────────┬──────────────────┘
//!                    ┌───────────┴────────────┐
//!              SqliteBackend            WorkerBackend
//!          (rusqlite, in-process)   (NDJSON worker, SQL Server)
//! ```
//!
//! Backends never cache connections: every call opens, uses, and releases
//! its own. Neither trait checks that a statement is read-only; that is the
//! job of [`crate::guard`].

mod sqlite;
mod worker;

pub use sqlite::SqliteBackend;
pub use worker::WorkerBackend;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConnectionConfig, Driver, Settings};
use crate::result::{ResultError, TabularResult};
use crate::sql::dialect::Dialect;
use crate::worker::{WorkerClient, WorkerError};

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by a database backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("statement exceeded the {0} second timeout")]
    Timeout(u64),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("malformed result set: {0}")]
    Result(#[from] ResultError),

    #[error("database task failed: {0}")]
    Task(String),
}

/// Column metadata reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(name: &str, data_type: &str, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// Read-only discovery of tables and their columns.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// List the tables a report may select from.
    async fn list_tables(&self) -> BackendResult<Vec<String>>;

    /// List the columns of one table, in ordinal order.
    async fn list_columns(&self, table: &str) -> BackendResult<Vec<ColumnInfo>>;
}

/// Runs one statement and materializes its full result.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Execute `sql`, failing with [`BackendError::Timeout`] once `timeout`
    /// elapses. No partial rows are returned on failure.
    async fn run(&self, sql: &str, timeout: Duration) -> BackendResult<TabularResult>;
}

/// A backend that can both describe and query a database.
pub trait Database: SchemaCatalog + QueryRunner {
    /// SQL dialect the compiler should target.
    fn dialect(&self) -> Dialect;
}

/// Open the backend for a configured connection.
pub async fn connect(
    settings: &Settings,
    connection: &ConnectionConfig,
) -> BackendResult<Arc<dyn Database>> {
    match connection.driver {
        Driver::Sqlite => Ok(Arc::new(SqliteBackend::new(&connection.connection_string))),
        Driver::Mssql => {
            let client = WorkerClient::spawn_with_settings(settings).await?;
            Ok(Arc::new(WorkerBackend::new(
                Arc::new(client),
                connection.driver.as_str(),
                &connection.connection_string,
            )))
        }
    }
}
