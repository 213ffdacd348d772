//! Tabular document export.
//!
//! Each exporter consumes a [`TabularResult`] plus an optional title and
//! produces a complete file in memory. Exporters keep no state between
//! calls; column order and every row are preserved, and nulls render as
//! empty cells.

mod docx;
mod pdf;
mod xlsx;

pub use pdf::{plan_pages, PageLayout};

use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::result::TabularResult;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export format: {0}")]
    UnknownFormat(String),

    #[error("spreadsheet writer failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("pdf writer failed: {0}")]
    Pdf(String),

    #[error("docx writer failed: {0}")]
    Docx(String),

    #[error("cannot export a result with no columns")]
    NoColumns,

    #[error("result too large for {format}: {detail}")]
    TooLarge {
        format: ExportFormat,
        detail: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Pdf,
    Docx,
}

impl ExportFormat {
    /// Parse a format name. Accepts `xlsx`/`excel`, `pdf`, `docx`/`word`.
    pub fn parse(name: &str) -> Result<Self, ExportError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            "docx" | "word" => Ok(Self::Docx),
            _ => Err(ExportError::UnknownFormat(name.to_string())),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Portrait width and height in millimetres.
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

/// Page setup for paginated formats.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExportOptions {
    pub page_size: PageSize,
    pub orientation: Orientation,
}

impl ExportOptions {
    /// Page width and height in millimetres after orientation.
    pub fn page_mm(&self) -> (f32, f32) {
        let (w, h) = self.page_size.dimensions_mm();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// A finished file ready to hand to a caller.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub file_name: String,
}

/// Pick the download name: the given one with the right extension, or a
/// timestamped default.
pub fn resolve_file_name(format: ExportFormat, file_name: Option<&str>) -> String {
    let ext = format.extension();
    match file_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name.to_ascii_lowercase().ends_with(&format!(".{}", ext)) => {
            name.to_string()
        }
        Some(name) => format!("{}.{}", name, ext),
        None => format!("Report_{}.{}", Local::now().format("%Y%m%d_%H%M%S"), ext),
    }
}

/// Render `result` in `format`.
pub fn export(
    format: ExportFormat,
    title: Option<&str>,
    result: &TabularResult,
    file_name: Option<&str>,
    options: &ExportOptions,
) -> Result<ExportedDocument, ExportError> {
    if result.column_count() == 0 {
        return Err(ExportError::NoColumns);
    }
    let title = title.map(str::trim).filter(|t| !t.is_empty());
    let bytes = match format {
        ExportFormat::Xlsx => xlsx::render(title, result)?,
        ExportFormat::Pdf => pdf::render(title, result, options)?,
        ExportFormat::Docx => docx::render(title, result)?,
    };
    let file_name = resolve_file_name(format, file_name);
    debug!(
        %format,
        bytes = bytes.len(),
        rows = result.row_count(),
        file_name = %file_name,
        "document exported"
    );

    Ok(ExportedDocument {
        bytes,
        mime_type: format.mime_type(),
        file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_aliases() {
        assert_eq!(ExportFormat::parse("Excel").unwrap(), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::parse("word").unwrap(), ExportFormat::Docx);
        assert_eq!(ExportFormat::parse(" PDF ").unwrap(), ExportFormat::Pdf);
        assert!(matches!(
            ExportFormat::parse("csv"),
            Err(ExportError::UnknownFormat(f)) if f == "csv"
        ));
    }

    #[test]
    fn test_file_name_resolution() {
        assert_eq!(
            resolve_file_name(ExportFormat::Pdf, Some("residents")),
            "residents.pdf"
        );
        assert_eq!(
            resolve_file_name(ExportFormat::Xlsx, Some("Residents.XLSX")),
            "Residents.XLSX"
        );

        let generated = resolve_file_name(ExportFormat::Docx, None);
        let re = regex::Regex::new(r"^Report_\d{8}_\d{6}\.docx$").unwrap();
        assert!(re.is_match(&generated), "{generated}");
    }

    #[test]
    fn test_no_columns_is_rejected() {
        let result = TabularResult::new(Vec::new()).unwrap();
        for format in [ExportFormat::Xlsx, ExportFormat::Pdf, ExportFormat::Docx] {
            let err = export(format, Some("Empty"), &result, None, &ExportOptions::default())
                .unwrap_err();
            assert!(matches!(err, ExportError::NoColumns), "{format}");
        }
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let options = ExportOptions::default();
        assert_eq!(options.page_mm(), (297.0, 210.0));
        let portrait = ExportOptions {
            page_size: PageSize::Letter,
            orientation: Orientation::Portrait,
        };
        assert_eq!(portrait.page_mm(), (215.9, 279.4));
    }
}
