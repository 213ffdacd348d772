//! TOML-based configuration for Tabula.
//!
//! Supports a config file (tabula.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [connections.default]
//! driver = "sqlite"
//! connection_string = "./records.db"
//!
//! [connections.office]
//! driver = "mssql"
//! connection_string = "${RECORDS_DB_CONNECTION_STRING}"
//!
//! [worker]
//! path = "/usr/local/bin/tabula-worker"
//! request_timeout_secs = 30
//!
//! [execution]
//! timeout_secs = 300
//! guard = "denylist"
//! validate_columns = true
//! strict_numeric_literals = false
//!
//! [export]
//! default_title = "Report"
//! page_size = "a4"
//! orientation = "landscape"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::connection::{ConnectionConfig, Driver};
use crate::export::{Orientation, PageSize};
use crate::guard::GuardMode;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Worker binary not found. Set worker.path in tabula.toml")]
    WorkerNotFound,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named database connections.
    pub connections: HashMap<String, ConnectionSettings>,

    /// Worker configuration.
    pub worker: WorkerSettings,

    /// Statement execution.
    pub execution: ExecutionSettings,

    /// Document export.
    pub export: ExportSettings,

    /// HTTP server.
    pub server: ServerSettings,
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Database driver (sqlite, mssql).
    pub driver: String,

    /// Connection string (supports ${ENV_VAR} expansion).
    pub connection_string: String,
}

impl ConnectionSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        Driver::from_str(&self.driver)
            .map_err(|_| SettingsError::UnsupportedDriver(self.driver.clone()))
    }

    /// Get the connection string with environment variables expanded.
    pub fn resolved_connection_string(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.connection_string)
    }

    /// Resolve driver and connection string.
    pub fn resolve(&self) -> Result<ConnectionConfig, SettingsError> {
        Ok(ConnectionConfig {
            driver: self.driver_type()?,
            connection_string: self.resolved_connection_string()?,
        })
    }
}

/// Worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to worker binary (supports ${ENV_VAR} expansion).
    pub path: Option<String>,

    /// Per-request timeout for catalog calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            path: None,
            request_timeout_secs: 30,
        }
    }
}

/// Execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Upper bound for one statement, in seconds.
    pub timeout_secs: u64,

    /// Read-only check applied before execution.
    pub guard: GuardMode,

    /// Check referenced tables and columns against the catalog.
    pub validate_columns: bool,

    /// Require numeric-looking text for unquoted filter values.
    pub strict_numeric_literals: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            guard: GuardMode::Denylist,
            validate_columns: true,
            strict_numeric_literals: false,
        }
    }
}

impl ExecutionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Export configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Title used when a request carries none.
    pub default_title: Option<String>,

    /// PDF page size.
    pub page_size: PageSize,

    /// PDF orientation.
    pub orientation: Orientation,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            default_title: None,
            page_size: PageSize::A4,
            orientation: Orientation::Landscape,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `TABULA_CONFIG`
    /// 2. `./tabula.toml`
    /// 3. `~/.config/tabula/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("TABULA_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("tabula.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tabula").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Get a connection by name.
    pub fn get_connection(&self, name: &str) -> Result<&ConnectionSettings, SettingsError> {
        self.connections
            .get(name)
            .ok_or_else(|| SettingsError::ConnectionNotFound(name.to_string()))
    }

    /// Get the default connection ("default" if it exists, else the first one).
    pub fn default_connection(&self) -> Option<(&str, &ConnectionSettings)> {
        if let Some(conn) = self.connections.get("default") {
            return Some(("default", conn));
        }
        self.connections.iter().next().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve a named connection, or the default one when `name` is `None`.
    ///
    /// With no connections configured at all, falls back to
    /// `TABULA_DB_DRIVER` / `TABULA_DB_CONNECTION`.
    pub fn resolve_connection(&self, name: Option<&str>) -> Result<ConnectionConfig, SettingsError> {
        match name {
            Some(name) => self.get_connection(name)?.resolve(),
            None => match self.default_connection() {
                Some((_, conn)) => conn.resolve(),
                None => ConnectionConfig::from_env()
                    .map_err(|_| SettingsError::ConnectionNotFound("default".to_string())),
            },
        }
    }

    /// Get the worker binary path: the configured one, or a search of
    /// common locations and `PATH`.
    pub fn worker_path(&self) -> Result<PathBuf, SettingsError> {
        if let Some(path) = &self.worker.path {
            return Ok(PathBuf::from(expand_env_vars(path)?));
        }

        let candidates = ["./tabula-worker", "./worker/tabula-worker"];
        for candidate in candidates {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(path);
            }
        }

        if let Ok(output) = std::process::Command::new("which")
            .arg("tabula-worker")
            .output()
        {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }

        Err(SettingsError::WorkerNotFound)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // A lone $ is kept as-is.
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_braces() {
        env::set_var("TABULA_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${TABULA_TEST_VAR}").unwrap(), "hello");
        assert_eq!(
            expand_env_vars("prefix_${TABULA_TEST_VAR}_suffix").unwrap(),
            "prefix_hello_suffix"
        );
        env::remove_var("TABULA_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        env::set_var("TABULA_TEST_VAR2", "world");
        assert_eq!(expand_env_vars("$TABULA_TEST_VAR2").unwrap(), "world");
        assert_eq!(expand_env_vars("$TABULA_TEST_VAR2!").unwrap(), "world!");
        assert_eq!(expand_env_vars("cost: $ 5").unwrap(), "cost: $ 5");
        env::remove_var("TABULA_TEST_VAR2");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("${TABULA_NONEXISTENT_VAR_12345}");
        assert!(matches!(result, Err(SettingsError::MissingEnvVar(_))));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[connections.default]
driver = "sqlite"
connection_string = "./records.db"

[connections.office]
driver = "mssql"
connection_string = "sqlserver://localhost?database=records"

[worker]
path = "/opt/tabula-worker"
request_timeout_secs = 10

[execution]
timeout_secs = 60
guard = "parsed"
validate_columns = false
strict_numeric_literals = true

[export]
default_title = "Residents"
page_size = "letter"
orientation = "portrait"

[server]
port = 9090
"#;

        let settings: Settings = toml::from_str(toml).unwrap();

        assert_eq!(settings.connections.len(), 2);
        let office = settings.resolve_connection(Some("office")).unwrap();
        assert_eq!(office.driver, Driver::Mssql);
        let default = settings.resolve_connection(None).unwrap();
        assert_eq!(default, ConnectionConfig::sqlite("./records.db"));

        assert_eq!(settings.worker.request_timeout_secs, 10);
        assert_eq!(settings.worker_path().unwrap(), PathBuf::from("/opt/tabula-worker"));

        assert_eq!(settings.execution.timeout(), Duration::from_secs(60));
        assert_eq!(settings.execution.guard, GuardMode::Parsed);
        assert!(!settings.execution.validate_columns);
        assert!(settings.execution.strict_numeric_literals);

        assert_eq!(settings.export.default_title.as_deref(), Some("Residents"));
        assert_eq!(settings.export.page_size, PageSize::Letter);
        assert_eq!(settings.export.orientation, Orientation::Portrait);

        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9090);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.execution.timeout_secs, 300);
        assert_eq!(settings.execution.guard, GuardMode::Denylist);
        assert!(settings.execution.validate_columns);
        assert!(!settings.execution.strict_numeric_literals);
        assert_eq!(settings.export.page_size, PageSize::A4);
        assert_eq!(settings.export.orientation, Orientation::Landscape);
    }

    #[test]
    fn test_unknown_connection() {
        let settings = Settings::default();
        assert!(matches!(
            settings.resolve_connection(Some("missing")),
            Err(SettingsError::ConnectionNotFound(_))
        ));
    }

    #[test]
    fn test_connection_env_expansion() {
        env::set_var("TABULA_TEST_DB_PATH", "/data/records.db");
        let conn = ConnectionSettings {
            driver: "sqlite".into(),
            connection_string: "${TABULA_TEST_DB_PATH}".into(),
        };
        assert_eq!(conn.resolve().unwrap().connection_string, "/data/records.db");
        env::remove_var("TABULA_TEST_DB_PATH");
    }
}
