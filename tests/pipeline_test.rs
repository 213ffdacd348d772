//! End-to-end: report configuration → SQL → SQLite → export.

use std::sync::Arc;

use tabula::backend::SqliteBackend;
use tabula::config::Settings;
use tabula::export::ExportFormat;
use tabula::report::ReportConfiguration;
use tabula::result::CellValue;
use tabula::service::ReportService;
use tabula::ErrorKind;
use tempfile::TempDir;

fn service_with(settings: Settings) -> (TempDir, ReportService) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Residents (
             Id INTEGER PRIMARY KEY,
             FirstName VARCHAR(50),
             LastName VARCHAR(50),
             Gender VARCHAR(10),
             Age INTEGER,
             HouseholdId INTEGER
         );
         CREATE TABLE Households (Id INTEGER PRIMARY KEY, Zone TEXT);
         INSERT INTO Households VALUES (1, 'North'), (2, 'South');
         INSERT INTO Residents VALUES
             (1, 'Ana',  'Zamora', 'Female', 41, 1),
             (2, 'Bo',   'Ng',     'Male',   17, 1),
             (3, 'Cleo', 'Adams',  'Female', 29, 2),
             (4, 'Dee',  'Moss',   'Female', NULL, 2);",
    )
    .unwrap();
    let service = ReportService::new(Arc::new(SqliteBackend::new(path)), settings);
    (dir, service)
}

fn service() -> (TempDir, ReportService) {
    service_with(Settings::default())
}

fn residents_report() -> ReportConfiguration {
    serde_json::from_value(serde_json::json!({
        "tables": ["Residents"],
        "fields": [
            { "table": "Residents", "column": "FirstName" },
            { "table": "Residents", "column": "LastName" }
        ],
        "filters": [{
            "table": "Residents", "column": "Gender", "declaredType": "varchar",
            "operator": "EQUALS", "value": "Female"
        }],
        "sortBy": [{ "table": "Residents", "column": "LastName", "direction": "ASC" }]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_catalog() {
    let (_dir, service) = service();
    assert_eq!(
        service.list_tables().await.unwrap(),
        vec!["Households", "Residents"]
    );
    let columns = service.list_columns("Residents").await.unwrap();
    assert_eq!(columns.len(), 6);
    assert_eq!(columns[3].name, "Gender");
}

#[tokio::test]
async fn test_residents_scenario_end_to_end() {
    let (_dir, service) = service();
    let run = service.run_report(&residents_report()).await.unwrap();

    assert_eq!(
        run.sql,
        "SELECT [Residents].[FirstName], [Residents].[LastName] FROM [Residents] \
         WHERE [Residents].[Gender] = 'Female' ORDER BY [Residents].[LastName] ASC"
    );
    let last_names: Vec<String> = run
        .result
        .rows()
        .iter()
        .map(|row| row[1].to_string())
        .collect();
    assert_eq!(last_names, ["Adams", "Moss", "Zamora"]);
}

#[tokio::test]
async fn test_limit_uses_trailing_clause_on_sqlite() {
    let (_dir, service) = service();
    let mut report = residents_report();
    report.limit = 2;

    let run = service.run_report(&report).await.unwrap();
    assert!(run.sql.ends_with(" LIMIT 2"), "{}", run.sql);
    assert_eq!(run.result.row_count(), 2);
}

#[tokio::test]
async fn test_join_group_and_aggregate() {
    let (_dir, service) = service();
    let report: ReportConfiguration = serde_json::from_value(serde_json::json!({
        "tables": ["Residents", "Households"],
        "fields": [
            { "table": "Households", "column": "Zone" },
            { "table": "Residents", "column": "Age", "aggregate": "MAX", "alias": "Oldest" }
        ],
        "joins": [{
            "type": "INNER",
            "leftTable": "Residents", "leftColumn": "HouseholdId",
            "rightTable": "Households", "rightColumn": "Id"
        }],
        "groupBy": [{ "table": "Households", "column": "Zone" }],
        "sortBy": [{ "table": "Households", "column": "Zone", "direction": "ASC" }]
    }))
    .unwrap();

    let run = service.run_report(&report).await.unwrap();
    assert_eq!(run.result.columns(), &["Zone", "Oldest"]);
    assert_eq!(run.result.get(0, "Oldest"), Some(&CellValue::Integer(41)));
    assert_eq!(run.result.get(1, "Oldest"), Some(&CellValue::Integer(29)));
}

#[tokio::test]
async fn test_unknown_column_is_configuration_error() {
    let (_dir, service) = service();
    let mut report = residents_report();
    report.fields[0].column = "MiddleName".into();

    let err = service.generate_sql(&report).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.to_string(), "unknown column: Residents.MiddleName");
}

#[tokio::test]
async fn test_validation_can_be_disabled() {
    let mut settings = Settings::default();
    settings.execution.validate_columns = false;
    let (_dir, service) = service_with(settings);

    let mut report = residents_report();
    report.fields[0].column = "MiddleName".into();

    let sql = service.generate_sql(&report).await.unwrap();
    let err = service.execute_report(&sql).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
}

#[tokio::test]
async fn test_rejected_statement_kind() {
    let (_dir, service) = service();
    let err = service.execute_report("DROP TABLE Residents").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RejectedStatement);

    // Still there.
    let result = service
        .execute_report("SELECT COUNT(*) AS n FROM Residents")
        .await
        .unwrap();
    assert_eq!(result.get(0, "n"), Some(&CellValue::Integer(4)));
}

#[tokio::test]
async fn test_null_survives_to_json() {
    let (_dir, service) = service();
    let result = service
        .execute_report(
            "SELECT [Residents].[FirstName], [Residents].[Age] FROM [Residents] \
             WHERE [Residents].[Id] = 4",
        )
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "columns": ["FirstName", "Age"],
            "rows": [{ "FirstName": "Dee", "Age": null }],
            "rowCount": 1
        })
    );
}

#[tokio::test]
async fn test_export_uses_default_title() {
    let mut settings = Settings::default();
    settings.export.default_title = Some("Resident Listing".into());
    let (_dir, service) = service_with(settings);

    let run = service.run_report(&residents_report()).await.unwrap();
    let doc = service
        .export(ExportFormat::Docx, None, Some("listing"), &run.result)
        .unwrap();
    assert_eq!(doc.file_name, "listing.docx");

    let bytes = service.export_excel(Some("Females"), None, &run.result).unwrap();
    assert!(bytes.starts_with(b"PK"));
}
