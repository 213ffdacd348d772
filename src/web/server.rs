//! Axum HTTP surface over [`ReportService`].

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::error::ReportError;
use crate::export::ExportFormat;
use crate::report::ReportConfiguration;
use crate::result::TabularResult;
use crate::service::{ReportRun, ReportService};

/// Build the axum router with all routes.
pub fn router(service: ReportService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Catalog
        .route("/api/catalog/tables", get(list_tables))
        .route("/api/catalog/tables/{table}/columns", get(list_columns))
        // Reports
        .route("/api/reports/sql", post(generate_sql))
        .route("/api/reports/execute", post(execute_report))
        .route("/api/reports/run", post(run_report))
        .route("/api/reports/export/{format}", post(export_report))
        .layer(cors)
        .with_state(service)
}

/// Bind and serve until the process is stopped.
pub async fn serve(
    service: ReportService,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "tabula listening");

    axum::serve(listener, router(service)).await?;
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

/// A [`ReportError`] rendered as `{ kind, message }`.
pub struct ApiError(ReportError);

impl<E: Into<ReportError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        warn!(kind = kind.as_str(), error = %self.0, "request failed");
        let body = ErrorBody {
            kind: kind.as_str(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError(ReportError::Invalid(rejection.body_text())))
}

// ============================================================================
// Catalog
// ============================================================================

/// GET /api/catalog/tables
#[tracing::instrument(skip_all)]
async fn list_tables(State(service): State<ReportService>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(service.list_tables().await?))
}

/// GET /api/catalog/tables/{table}/columns
#[tracing::instrument(skip_all, fields(table = %table))]
async fn list_columns(
    State(service): State<ReportService>,
    Path(table): Path<String>,
) -> ApiResult<Json<Vec<crate::backend::ColumnInfo>>> {
    Ok(Json(service.list_columns(&table).await?))
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Serialize)]
struct SqlResponse {
    sql: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    sql: String,
}

/// POST /api/reports/sql
#[tracing::instrument(skip_all)]
async fn generate_sql(
    State(service): State<ReportService>,
    body: Result<Json<ReportConfiguration>, JsonRejection>,
) -> ApiResult<Json<SqlResponse>> {
    let config = payload(body)?;
    let sql = service.generate_sql(&config).await?;
    Ok(Json(SqlResponse { sql }))
}

/// POST /api/reports/execute
#[tracing::instrument(skip_all)]
async fn execute_report(
    State(service): State<ReportService>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<Json<TabularResult>> {
    let request = payload(body)?;
    Ok(Json(service.execute_report(&request.sql).await?))
}

/// POST /api/reports/run
#[tracing::instrument(skip_all)]
async fn run_report(
    State(service): State<ReportService>,
    body: Result<Json<ReportConfiguration>, JsonRejection>,
) -> ApiResult<Json<ReportRun>> {
    let config = payload(body)?;
    Ok(Json(service.run_report(&config).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
}

/// Decode an export body. Any failure here, including broken JSON, is
/// malformed export input.
fn export_request(body: &[u8]) -> Result<(ExportRequest, TabularResult), ReportError> {
    let malformed = |e: serde_json::Error| ReportError::MalformedInput(e.to_string());
    let mut request: ExportRequest = serde_json::from_slice(body).map_err(malformed)?;
    let result = serde_json::from_value(request.result.take()).map_err(malformed)?;
    Ok((request, result))
}

/// POST /api/reports/export/{format}
#[tracing::instrument(skip_all, fields(format = %format))]
async fn export_report(
    State(service): State<ReportService>,
    Path(format): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    let format = ExportFormat::parse(&format)?;
    let (request, result) = export_request(&body)?;

    let document = service.export(
        format,
        request.title.as_deref(),
        request.file_name.as_deref(),
        &result,
    )?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        document.file_name.replace(['"', '\\'], "_")
    );
    let headers = [
        (header::CONTENT_TYPE, document.mime_type.to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, document.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultError;

    #[test]
    fn test_error_status_mapping() {
        let response = ApiError(ReportError::Invalid("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::from(ResultError::MissingField("rows")).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response =
            ApiError::from(crate::guard::GuardError::Rejected("DROP".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_broken_export_body_is_malformed_input() {
        let err = export_request(b"{ \"title\": ").unwrap_err();
        assert_eq!(err.kind().as_str(), "serialization");
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = export_request(br#"{ "title": "T", "result": { "rows": [] } }"#).unwrap_err();
        assert!(matches!(err, ReportError::MalformedInput(_)));
    }

    #[test]
    fn test_export_body_decodes() {
        let body = br#"{
            "title": "Residents",
            "fileName": "residents",
            "result": { "columns": ["Name"], "rows": [{ "Name": "Ana" }], "rowCount": 1 }
        }"#;
        let (request, result) = export_request(body).unwrap();
        assert_eq!(request.title.as_deref(), Some("Residents"));
        assert_eq!(request.file_name.as_deref(), Some("residents"));
        assert_eq!(result.columns(), ["Name"]);
        assert_eq!(result.row_count(), 1);
    }
}
