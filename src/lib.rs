//! # Tabula
//!
//! An ad-hoc report compiler with a read-only execution guard and tabular
//! document export.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              ReportConfiguration (JSON)                  │
//! │  (tables, fields, joins, filters, group, sort, limit)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [report::validate, optional]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SchemaCatalog (SQLite / SQL Server worker)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [report::compile → sql AST → dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    SQL statement                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [guard: read-only check + timeout]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    TabularResult                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [export]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  xlsx │ pdf │ docx                       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`service::ReportService`] wires these together for the CLI and the
//! HTTP server.

pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod guard;
pub mod report;
pub mod result;
pub mod service;
pub mod sql;
pub mod worker;

#[cfg(feature = "server")]
pub mod web;

pub use error::{ErrorKind, ReportError};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::backend::{Database, QueryRunner, SchemaCatalog, SqliteBackend};
    pub use crate::config::Settings;
    pub use crate::error::{ErrorKind, ReportError};
    pub use crate::export::{ExportFormat, ExportOptions, ExportedDocument};
    pub use crate::guard::{check_read_only, ExecutionGuard, GuardMode};
    pub use crate::report::{
        compile, compile_with, Aggregate, CompileOptions, Direction, FieldSpec, FilterSpec,
        GroupKey, JoinKind, JoinSpec, ReportConfiguration, SortSpec,
    };
    pub use crate::result::{CellValue, TabularResult};
    pub use crate::service::{ReportRun, ReportService};
    pub use crate::sql::Dialect;
}
