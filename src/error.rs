//! Crate-level error folding every layer into four reportable kinds.

use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::config::SettingsError;
use crate::export::ExportError;
use crate::guard::GuardError;
use crate::report::{CompileError, ValidationError};
use crate::result::ResultError;

/// The category a caller sees for any failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The report configuration or request is invalid.
    Configuration,
    /// The statement failed the read-only check and was never executed.
    RejectedStatement,
    /// The database failed or the statement timed out.
    Execution,
    /// Export input was malformed or a document writer failed.
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::RejectedStatement => "rejected_statement",
            ErrorKind::Execution => "execution",
            ErrorKind::Serialization => "serialization",
        }
    }

    /// HTTP status used when the error crosses the web boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Configuration => 400,
            ErrorKind::RejectedStatement => 403,
            ErrorKind::Execution => 502,
            ErrorKind::Serialization => 422,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("invalid result table: {0}")]
    Result(#[from] ResultError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("malformed export input: {0}")]
    MalformedInput(String),

    #[error("{0}")]
    Invalid(String),
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::Compile(_) | ReportError::Settings(_) | ReportError::Invalid(_) => {
                ErrorKind::Configuration
            }
            ReportError::Validation(ValidationError::Catalog(_)) => ErrorKind::Execution,
            ReportError::Validation(_) => ErrorKind::Configuration,
            ReportError::Backend(BackendError::TableNotFound(_)) => ErrorKind::Configuration,
            ReportError::Guard(GuardError::Rejected(_)) => ErrorKind::RejectedStatement,
            ReportError::Guard(_) | ReportError::Backend(_) => ErrorKind::Execution,
            ReportError::Export(ExportError::UnknownFormat(_)) => ErrorKind::Configuration,
            ReportError::Export(_) | ReportError::Result(_) | ReportError::MalformedInput(_) => {
                ErrorKind::Serialization
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
