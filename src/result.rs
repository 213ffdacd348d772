//! Tabular result model shared by execution and every exporter.
//!
//! A [`TabularResult`] is an ordered list of distinct column names plus rows
//! stored positionally, one [`CellValue`] per column. Missing values are
//! [`CellValue::Null`], never absent.
//!
//! On the wire a result looks like:
//!
//! ```json
//! {
//!   "columns": ["FirstName", "Age"],
//!   "rows": [{ "FirstName": "Ana", "Age": 31 }, { "FirstName": "Bo", "Age": null }],
//!   "rowCount": 2
//! }
//! ```
//!
//! `rowCount` is always derived from `rows` and ignored on input.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Errors raised when a result does not have a valid shape.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResultError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row} has key '{key}' which is not a result column")]
    UnknownKey { row: usize, key: String },
}

// =============================================================================
// Cell values
// =============================================================================

/// A single loosely-typed cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Boolean(bool),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Convert an untyped JSON value. Strings stay text; no date sniffing.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Integer(i),
                None => n
                    .as_f64()
                    .map(CellValue::Float)
                    .unwrap_or_else(|| CellValue::Text(n.to_string())),
            },
            Value::String(s) => CellValue::Text(s),
            // Nested structures are flattened to their JSON text.
            other @ (Value::Array(_) | Value::Object(_)) => CellValue::Text(other.to_string()),
        }
    }
}

/// Natural string conversion used by every exporter. Null renders empty.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(n) => write!(f, "{}", n),
            CellValue::Float(x) if x.is_finite() => {
                let mut buffer = ryu::Buffer::new();
                f.write_str(buffer.format_finite(*x))
            }
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Integer(n) => serializer.serialize_i64(*n),
            CellValue::Float(x) => serializer.serialize_f64(*x),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S")),
            CellValue::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(CellValue::from_json)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Integer(n)
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        CellValue::Float(x)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

// =============================================================================
// Tabular result
// =============================================================================

/// Column names plus positional rows.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "RawTabularResult")]
pub struct TabularResult {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl TabularResult {
    /// Create an empty result. Column names must be distinct.
    pub fn new(columns: Vec<String>) -> Result<Self, ResultError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(ResultError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create an empty result from database column labels.
    ///
    /// Statements may legally return the same label twice (`[A].[Id]` and
    /// `[B].[Id]`); later occurrences get a `_2`, `_3`... suffix.
    pub fn with_unique_columns<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut columns = Vec::new();
        for label in labels {
            let label = label.into();
            let mut name = label.clone();
            let mut n = 2;
            while seen.contains(&name) {
                name = format!("{}_{}", label, n);
                n += 1;
            }
            seen.insert(name.clone());
            columns.push(name);
        }
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a result from columns and positional rows.
    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, ResultError> {
        let mut result = Self::new(columns)?;
        for row in rows {
            result.push_row(row)?;
        }
        Ok(result)
    }

    /// Append a row. Its width must match the column count.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), ResultError> {
        if row.len() != self.columns.len() {
            return Err(ResultError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Always `rows().len()`.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

/// One row rendered as a map in column order.
struct RowRef<'a> {
    columns: &'a [String],
    values: &'a [CellValue],
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for TabularResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<RowRef<'_>> = self
            .rows
            .iter()
            .map(|values| RowRef {
                columns: &self.columns,
                values,
            })
            .collect();

        let mut state = serializer.serialize_struct("TabularResult", 3)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("rows", &rows)?;
        state.serialize_field("rowCount", &self.rows.len())?;
        state.end()
    }
}

/// Wire shape accepted on input, validated into a [`TabularResult`].
#[derive(Debug, Deserialize)]
struct RawTabularResult {
    columns: Option<Vec<String>>,
    rows: Option<Vec<HashMap<String, CellValue>>>,
}

impl TryFrom<RawTabularResult> for TabularResult {
    type Error = ResultError;

    fn try_from(raw: RawTabularResult) -> Result<Self, Self::Error> {
        let columns = raw.columns.ok_or(ResultError::MissingField("columns"))?;
        let raw_rows = raw.rows.ok_or(ResultError::MissingField("rows"))?;

        let mut result = TabularResult::new(columns)?;
        for (row_idx, mut record) in raw_rows.into_iter().enumerate() {
            let values: Vec<CellValue> = result
                .columns
                .iter()
                .map(|name| record.remove(name).unwrap_or_default())
                .collect();

            if let Some(key) = record.into_keys().next() {
                return Err(ResultError::UnknownKey { row: row_idx, key });
            }
            result.rows.push(values);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TabularResult {
        TabularResult::from_rows(
            vec!["Name".into(), "Age".into()],
            vec![
                vec!["Ana".into(), CellValue::Integer(31)],
                vec!["Bo".into(), CellValue::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_display_conversions() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Integer(-4).to_string(), "-4");
        assert_eq!(CellValue::Float(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Boolean(true).to_string(), "true");
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(CellValue::Date(d).to_string(), "2024-03-09");
        let dt = d.and_hms_opt(7, 5, 0).unwrap();
        assert_eq!(CellValue::DateTime(dt).to_string(), "2024-03-09 07:05:00");
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = TabularResult::new(vec!["A".into(), "A".into()]).unwrap_err();
        assert_eq!(err, ResultError::DuplicateColumn("A".into()));
    }

    #[test]
    fn test_unique_column_labels() {
        let result = TabularResult::with_unique_columns(["Id", "Name", "Id", "Id"]);
        assert_eq!(result.columns(), &["Id", "Name", "Id_2", "Id_3"]);
    }

    #[test]
    fn test_row_width_checked() {
        let mut result = TabularResult::new(vec!["A".into()]).unwrap();
        let err = result.push_row(vec![]).unwrap_err();
        assert!(matches!(err, ResultError::RowWidth { expected: 1, found: 0, .. }));
    }

    #[test]
    fn test_serialize_rows_as_ordered_objects() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"columns":["Name","Age"],"rows":[{"Name":"Ana","Age":31},{"Name":"Bo","Age":null}],"rowCount":2}"#
        );
    }

    #[test]
    fn test_deserialize_fills_missing_keys_with_null() {
        let result: TabularResult = serde_json::from_value(json!({
            "columns": ["Name", "Age"],
            "rows": [{ "Name": "Ana" }],
            "rowCount": 99
        }))
        .unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.get(0, "Age"), Some(&CellValue::Null));
    }

    #[test]
    fn test_deserialize_rejects_bad_shapes() {
        let missing = serde_json::from_value::<TabularResult>(json!({ "rows": [] }));
        assert!(missing.unwrap_err().to_string().contains("columns"));

        let missing_rows = serde_json::from_value::<TabularResult>(json!({ "columns": [] }));
        assert!(missing_rows.unwrap_err().to_string().contains("rows"));

        let unknown = serde_json::from_value::<TabularResult>(json!({
            "columns": ["A"],
            "rows": [{ "A": 1, "B": 2 }]
        }));
        assert!(unknown.unwrap_err().to_string().contains("'B'"));
    }
}
