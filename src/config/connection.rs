//! Database connection configuration.
//!
//! A connection resolves to a driver plus a driver-specific connection
//! string. Without a config file it can come from the environment:
//! - `TABULA_DB_DRIVER`: Database driver (sqlite, mssql)
//! - `TABULA_DB_CONNECTION`: Connection string (file path for SQLite)

use std::env;

use serde::{Deserialize, Serialize};

use crate::sql::dialect::Dialect;

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}. Supported: sqlite, mssql")]
    UnsupportedDriver(String),
}

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Driver {
    /// SQLite file, opened in-process
    Sqlite,
    /// Microsoft SQL Server, through the worker process
    Mssql,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "mssql" | "sqlserver" | "sql_server" => Ok(Driver::Mssql),
            other => Err(ConnectionError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Get the driver name for the worker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
            Driver::Mssql => "mssql",
        }
    }

    /// SQL dialect compiled reports target on this driver.
    pub fn dialect(&self) -> Dialect {
        match self {
            Driver::Sqlite => Dialect::Sqlite,
            Driver::Mssql => Dialect::TSql,
        }
    }
}

impl TryFrom<String> for Driver {
    type Error = ConnectionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Driver::from_str(&s)
    }
}

impl From<Driver> for String {
    fn from(driver: Driver) -> Self {
        driver.as_str().to_string()
    }
}

/// A resolved database connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub driver: Driver,
    /// Connection string with environment variables already expanded.
    pub connection_string: String,
}

impl ConnectionConfig {
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: Driver::Sqlite,
            connection_string: path.into(),
        }
    }

    pub fn mssql(connection_string: impl Into<String>) -> Self {
        Self {
            driver: Driver::Mssql,
            connection_string: connection_string.into(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConnectionError> {
        let driver_str = env::var("TABULA_DB_DRIVER")
            .map_err(|_| ConnectionError::MissingEnvVar("TABULA_DB_DRIVER".to_string()))?;
        let driver = Driver::from_str(&driver_str)?;

        let connection_string = env::var("TABULA_DB_CONNECTION")
            .map_err(|_| ConnectionError::MissingEnvVar("TABULA_DB_CONNECTION".to_string()))?;

        Ok(Self {
            driver,
            connection_string,
        })
    }
}
