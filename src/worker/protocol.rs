//! Protocol types for worker communication.
//!
//! One JSON object per line in each direction. Requests carry a unique id
//! that the matching response echoes back.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Envelope
// ============================================================================

/// Request envelope sent to the worker.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation.
    pub id: String,
    /// Method name (e.g., "metadata.list_tables").
    pub method: String,
    /// Method-specific parameters.
    pub params: serde_json::Value,
}

/// Response envelope received from the worker.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to.
    pub id: String,
    /// Whether the request succeeded.
    pub success: bool,
    /// Result data (present if success = true).
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error information (present if success = false).
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Error information in a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

// ============================================================================
// Connection Parameters (included in all requests)
// ============================================================================

/// Database connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Database driver name (e.g., "mssql").
    pub driver: String,
    /// Driver-specific connection string.
    pub connection_string: String,
}

// ============================================================================
// Request Parameters
// ============================================================================

/// Parameters for `metadata.list_tables`.
#[derive(Debug, Clone, Serialize)]
pub struct ListTablesParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// Schema to list tables from; all schemas when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Parameters for `metadata.get_columns`.
#[derive(Debug, Clone, Serialize)]
pub struct GetColumnsParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// Schema the table belongs to; the worker's default when empty.
    pub schema: String,
    pub table: String,
}

/// Parameters for `query.execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteQueryParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    pub sql: String,
    /// Command timeout the worker applies on its side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Basic table information.
#[derive(Debug, Clone, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    /// Table type ("TABLE", "VIEW").
    #[serde(rename = "type", default)]
    pub table_type: String,
}

impl TableInfo {
    /// `schema.name`, or just `name` when the schema is empty.
    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }
}

/// Response from `metadata.list_tables`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTablesResponse {
    pub tables: Vec<TableInfo>,
}

/// Column information.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Ordinal position (1-based).
    #[serde(default)]
    pub position: i32,
    /// Database-specific type name.
    pub data_type: String,
    pub is_nullable: bool,
}

/// Response from `metadata.get_columns`.
#[derive(Debug, Clone, Deserialize)]
pub struct GetColumnsResponse {
    pub columns: Vec<ColumnInfo>,
}

/// Column information in query results.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultColumn {
    /// Column name or alias.
    pub name: String,
    /// Database-specific type.
    #[serde(default)]
    pub data_type: String,
}

/// Response from `query.execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteQueryResponse {
    pub columns: Vec<QueryResultColumn>,
    /// Positional rows, one value per column.
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub row_count: i64,
}

// ============================================================================
// Method Names
// ============================================================================

/// Worker method names.
pub mod methods {
    pub const LIST_TABLES: &str = "metadata.list_tables";
    pub const GET_COLUMNS: &str = "metadata.get_columns";
    pub const EXECUTE_QUERY: &str = "query.execute";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_params_flatten_connection() {
        let params = ExecuteQueryParams {
            connection: ConnectionParams {
                driver: "mssql".into(),
                connection_string: "server=.;database=records".into(),
            },
            sql: "SELECT 1".into(),
            timeout_secs: Some(300),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["driver"], "mssql");
        assert_eq!(json["sql"], "SELECT 1");
        assert_eq!(json["timeout_secs"], 300);
        assert!(json.get("connection").is_none());
    }

    #[test]
    fn test_execute_response() {
        let json = r#"{
            "columns": [{"name": "FirstName", "data_type": "nvarchar"}, {"name": "Age", "data_type": "int"}],
            "rows": [["Ana", 31], ["Bo", null]],
            "row_count": 2
        }"#;
        let response: ExecuteQueryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.columns.len(), 2);
        assert_eq!(response.rows[1][1], serde_json::Value::Null);
    }

    #[test]
    fn test_qualified_table_name() {
        let info: TableInfo =
            serde_json::from_str(r#"{"schema": "dbo", "name": "Residents", "type": "TABLE"}"#)
                .unwrap();
        assert_eq!(info.qualified_name(), "dbo.Residents");
    }
}
