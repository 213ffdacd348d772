//! Report service: the operations exposed to the CLI and HTTP surfaces.
//!
//! ```text
//! generate_sql:   config ──► validate (catalog) ──► compile ──► SQL
//! execute_report: SQL ──► guard ──► backend ──► TabularResult
//! export:         TabularResult ──► xlsx | pdf | docx
//! ```
//!
//! The service holds no per-request state. Backends open and release a
//! connection for every call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::backend::{self, BackendResult, ColumnInfo, Database, QueryRunner};
use crate::config::Settings;
use crate::error::Result;
use crate::export::{self, ExportFormat, ExportOptions, ExportedDocument};
use crate::guard::ExecutionGuard;
use crate::report::{compile_with, validate_against_catalog, CompileOptions, ReportConfiguration};
use crate::result::TabularResult;

/// Lets the guard run statements through a shared database handle.
struct DatabaseRunner(Arc<dyn Database>);

#[async_trait]
impl QueryRunner for DatabaseRunner {
    async fn run(&self, sql: &str, timeout: Duration) -> BackendResult<TabularResult> {
        self.0.run(sql, timeout).await
    }
}

/// Compiled SQL together with the rows it produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRun {
    pub sql: String,
    pub result: TabularResult,
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<dyn Database>,
    guard: ExecutionGuard,
    settings: Arc<Settings>,
}

impl ReportService {
    pub fn new(db: Arc<dyn Database>, settings: Settings) -> Self {
        let guard = ExecutionGuard::new(
            Arc::new(DatabaseRunner(db.clone())),
            settings.execution.timeout(),
        )
        .with_mode(settings.execution.guard);
        debug!(
            mode = ?guard.mode(),
            timeout_secs = guard.timeout().as_secs(),
            "execution guard ready"
        );
        Self {
            db,
            guard,
            settings: Arc::new(settings),
        }
    }

    /// Open the named connection (or the default one) from settings.
    pub async fn connect(settings: Settings, connection: Option<&str>) -> Result<Self> {
        let config = settings.resolve_connection(connection)?;
        info!(driver = config.driver.as_str(), "connecting");
        let db = backend::connect(&settings, &config).await?;
        Ok(Self::new(db, settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.db.list_tables().await?)
    }

    pub async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self.db.list_columns(table).await?)
    }

    /// Compile a report for the connected database's dialect.
    pub async fn generate_sql(&self, config: &ReportConfiguration) -> Result<String> {
        let execution = &self.settings.execution;
        if execution.validate_columns {
            validate_against_catalog(config, self.db.as_ref()).await?;
        }
        let options =
            CompileOptions::new(self.db.dialect()).strict(execution.strict_numeric_literals);
        Ok(compile_with(config, options)?)
    }

    /// Run a statement through the read-only guard.
    pub async fn execute_report(&self, sql: &str) -> Result<TabularResult> {
        Ok(self.guard.execute(sql).await?)
    }

    /// Compile then execute.
    pub async fn run_report(&self, config: &ReportConfiguration) -> Result<ReportRun> {
        let sql = self.generate_sql(config).await?;
        let result = self.execute_report(&sql).await?;
        Ok(ReportRun { sql, result })
    }

    /// Render a result; a missing title falls back to the configured default.
    pub fn export(
        &self,
        format: ExportFormat,
        title: Option<&str>,
        file_name: Option<&str>,
        result: &TabularResult,
    ) -> Result<ExportedDocument> {
        let settings = &self.settings.export;
        let title = title.or(settings.default_title.as_deref());
        let options = ExportOptions {
            page_size: settings.page_size,
            orientation: settings.orientation,
        };
        let document = export::export(format, title, result, file_name, &options)?;
        info!(
            format = %format,
            file_name = %document.file_name,
            bytes = document.bytes.len(),
            "report exported"
        );
        Ok(document)
    }

    pub fn export_excel(
        &self,
        title: Option<&str>,
        file_name: Option<&str>,
        result: &TabularResult,
    ) -> Result<Vec<u8>> {
        Ok(self.export(ExportFormat::Xlsx, title, file_name, result)?.bytes)
    }

    pub fn export_pdf(
        &self,
        title: Option<&str>,
        file_name: Option<&str>,
        result: &TabularResult,
    ) -> Result<Vec<u8>> {
        Ok(self.export(ExportFormat::Pdf, title, file_name, result)?.bytes)
    }

    pub fn export_docx(
        &self,
        title: Option<&str>,
        file_name: Option<&str>,
        result: &TabularResult,
    ) -> Result<Vec<u8>> {
        Ok(self.export(ExportFormat::Docx, title, file_name, result)?.bytes)
    }
}
