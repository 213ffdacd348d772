//! SQL Server backend reached through the worker process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendResult, ColumnInfo, Database, QueryRunner, SchemaCatalog};
use crate::result::{CellValue, TabularResult};
use crate::sql::dialect::Dialect;
use crate::sql::TableRef;
use crate::worker::protocol::{
    methods, ConnectionParams, ExecuteQueryParams, ExecuteQueryResponse, GetColumnsParams,
    GetColumnsResponse, ListTablesParams, ListTablesResponse,
};
use crate::worker::WorkerClient;

/// Schema assumed when a table name is not qualified.
const DEFAULT_SCHEMA: &str = "dbo";

pub struct WorkerBackend {
    client: Arc<WorkerClient>,
    connection: ConnectionParams,
}

impl WorkerBackend {
    pub fn new(client: Arc<WorkerClient>, driver: &str, connection_string: &str) -> Self {
        Self {
            client,
            connection: ConnectionParams {
                driver: driver.to_string(),
                connection_string: connection_string.to_string(),
            },
        }
    }
}

/// Convert a worker query response into a result table.
fn into_result(response: ExecuteQueryResponse) -> BackendResult<TabularResult> {
    let mut result =
        TabularResult::with_unique_columns(response.columns.into_iter().map(|c| c.name));
    for row in response.rows {
        result.push_row(row.into_iter().map(CellValue::from_json).collect())?;
    }
    Ok(result)
}

#[async_trait]
impl SchemaCatalog for WorkerBackend {
    async fn list_tables(&self) -> BackendResult<Vec<String>> {
        let response: ListTablesResponse = self
            .client
            .request(
                methods::LIST_TABLES,
                ListTablesParams {
                    connection: self.connection.clone(),
                    schema: None,
                },
            )
            .await?;
        Ok(response.tables.iter().map(|t| t.qualified_name()).collect())
    }

    async fn list_columns(&self, table: &str) -> BackendResult<Vec<ColumnInfo>> {
        let table_ref = TableRef::parse(table);
        let response: GetColumnsResponse = self
            .client
            .request(
                methods::GET_COLUMNS,
                GetColumnsParams {
                    connection: self.connection.clone(),
                    schema: table_ref
                        .schema
                        .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
                    table: table_ref.table,
                },
            )
            .await?;

        if response.columns.is_empty() {
            return Err(super::BackendError::TableNotFound(table.to_string()));
        }

        let mut columns = response.columns;
        columns.sort_by_key(|c| c.position);
        Ok(columns
            .into_iter()
            .map(|c| ColumnInfo {
                name: c.name,
                data_type: c.data_type,
                nullable: c.is_nullable,
            })
            .collect())
    }
}

#[async_trait]
impl QueryRunner for WorkerBackend {
    async fn run(&self, sql: &str, timeout: Duration) -> BackendResult<TabularResult> {
        let params = ExecuteQueryParams {
            connection: self.connection.clone(),
            sql: sql.to_string(),
            timeout_secs: Some(timeout.as_secs().max(1)),
        };
        // Give the worker a moment past its own deadline to report it.
        let wait = timeout + Duration::from_secs(5);
        let response: ExecuteQueryResponse = self
            .client
            .request_with_timeout(methods::EXECUTE_QUERY, params, wait)
            .await?;
        into_result(response)
    }
}

impl Database for WorkerBackend {
    fn dialect(&self) -> Dialect {
        Dialect::TSql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::result::ResultError;

    #[test]
    fn test_into_result() {
        let response: ExecuteQueryResponse = serde_json::from_value(serde_json::json!({
            "columns": [
                {"name": "FirstName", "type": "varchar"},
                {"name": "Age", "type": "int"},
                {"name": "Age", "type": "int"}
            ],
            "rows": [["Ana", 41, null], ["Bo", null, 7]],
            "row_count": 2
        }))
        .unwrap();

        let result = into_result(response).unwrap();
        assert_eq!(result.columns(), &["FirstName", "Age", "Age_2"]);
        assert_eq!(result.get(0, "Age"), Some(&CellValue::Integer(41)));
        assert_eq!(result.get(1, "Age"), Some(&CellValue::Null));
        assert_eq!(result.get(1, "Age_2"), Some(&CellValue::Integer(7)));
    }

    #[test]
    fn test_into_result_ragged_row() {
        let response: ExecuteQueryResponse = serde_json::from_value(serde_json::json!({
            "columns": [{"name": "A", "type": "int"}],
            "rows": [[1, 2]],
            "row_count": 1
        }))
        .unwrap();

        let err = into_result(response).unwrap_err();
        assert!(matches!(
            err,
            BackendError::Result(ResultError::RowWidth { .. })
        ));
    }
}
