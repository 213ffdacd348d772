//! Report configuration model and its compiler.
//!
//! A [`ReportConfiguration`] is the declarative request a report author
//! assembles: tables, fields, joins, filters, grouping, sorting and a row
//! limit. It is created per request, compiled once, and discarded.
//!
//! ```text
//! ReportConfiguration ──► validate (optional, catalog) ──► compile ──► SQL
//!                                                           │
//!                                            filter::compile_filter (per filter)
//! ```
//!
//! JSON uses camelCase keys:
//!
//! ```json
//! {
//!   "tables": ["Residents"],
//!   "fields": [{ "table": "Residents", "column": "FirstName" }],
//!   "filters": [{ "table": "Residents", "column": "Gender",
//!                 "declaredType": "varchar", "operator": "EQUALS", "value": "Female" }],
//!   "sortBy": [{ "table": "Residents", "column": "LastName", "direction": "ASC" }],
//!   "limit": 0
//! }
//! ```

mod compile;
mod filter;
mod validate;

pub use compile::{compile, compile_with, CompileError, CompileOptions};
pub use filter::{compile_filter, filter_expr, FilterError, FilterOperator};
pub use validate::{referenced_columns, validate_against_catalog, ValidationError};

use serde::{Deserialize, Deserializer, Serialize};

use crate::sql::query::{JoinType, SortDir};

// =============================================================================
// Configuration
// =============================================================================

/// The declarative description of one ad-hoc report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfiguration {
    /// Selected tables. The first one is the FROM target.
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub group_by: Vec<GroupKey>,
    #[serde(default)]
    pub sort_by: Vec<SortSpec>,
    /// Row limit; 0 means unlimited.
    #[serde(default)]
    pub limit: u64,
}

impl ReportConfiguration {
    /// The FROM table, if one was selected.
    pub fn primary_table(&self) -> Option<&str> {
        self.tables
            .first()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }

    /// Filters that reach the compiler. Filters with an empty table or
    /// column are dropped silently.
    pub fn active_filters(&self) -> impl Iterator<Item = &FilterSpec> {
        self.filters.iter().filter(|f| !f.is_noise())
    }
}

/// One SELECT list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub table: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
}

impl FieldSpec {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            alias: None,
            aggregate: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }
}

/// Aggregate function wrapped around a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregate {
    #[serde(alias = "sum", alias = "Sum")]
    Sum,
    #[serde(alias = "count", alias = "Count")]
    Count,
    #[serde(alias = "avg", alias = "Avg")]
    Avg,
    #[serde(alias = "min", alias = "Min")]
    Min,
    #[serde(alias = "max", alias = "Max")]
    Max,
}

impl Aggregate {
    pub fn function_name(&self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Count => "COUNT",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

/// An equality join between an earlier table and `right_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSpec {
    #[serde(alias = "type", alias = "joinType")]
    pub kind: JoinKind,
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    #[serde(alias = "inner", alias = "Inner")]
    Inner,
    #[serde(alias = "left", alias = "Left")]
    Left,
    #[serde(alias = "right", alias = "Right")]
    Right,
    #[serde(alias = "full", alias = "Full")]
    Full,
}

impl From<JoinKind> for JoinType {
    fn from(kind: JoinKind) -> Self {
        match kind {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::Left => JoinType::Left,
            JoinKind::Right => JoinType::Right,
            JoinKind::Full => JoinType::Full,
        }
    }
}

/// One typed filter.
///
/// `operator` stays a string here: unknown operators are a compile error
/// naming the offending text, not a deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub column: String,
    /// Advisory type name; only decides string vs. verbatim literals.
    #[serde(default)]
    pub declared_type: String,
    #[serde(default)]
    pub operator: String,
    #[serde(
        default,
        deserialize_with = "deserialize_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,
}

impl FilterSpec {
    pub fn new(table: &str, column: &str, declared_type: &str, operator: &str) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            declared_type: declared_type.into(),
            operator: operator.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.into());
        self
    }

    fn is_noise(&self) -> bool {
        self.table.trim().is_empty() || self.column.trim().is_empty()
    }
}

/// Accept a string, number or boolean filter value and keep its text.
fn deserialize_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "filter value must be a scalar, got {}",
            other
        ))),
    }
}

/// A GROUP BY key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupKey {
    pub table: String,
    pub column: String,
}

impl GroupKey {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// An ORDER BY key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub table: String,
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortSpec {
    pub fn new(table: &str, column: &str, direction: Direction) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    #[serde(alias = "asc", alias = "Asc")]
    Asc,
    #[serde(alias = "desc", alias = "Desc")]
    Desc,
}

impl From<Direction> for SortDir {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => SortDir::Asc,
            Direction::Desc => SortDir::Desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case_configuration() {
        let config: ReportConfiguration = serde_json::from_str(
            r#"{
                "tables": ["Residents", "Households"],
                "fields": [
                    { "table": "Residents", "column": "FirstName", "alias": "Name" },
                    { "table": "Residents", "column": "Age", "aggregate": "avg" }
                ],
                "joins": [{
                    "kind": "LEFT",
                    "leftTable": "Residents", "leftColumn": "HouseholdId",
                    "rightTable": "Households", "rightColumn": "Id"
                }],
                "filters": [
                    { "table": "Residents", "column": "Age", "declaredType": "int",
                      "operator": ">=", "value": 18 }
                ],
                "groupBy": [{ "table": "Residents", "column": "Zone" }],
                "sortBy": [{ "table": "Residents", "column": "Zone", "direction": "desc" }],
                "limit": 10
            }"#,
        )
        .unwrap();

        assert_eq!(config.primary_table(), Some("Residents"));
        assert_eq!(config.fields[0].alias.as_deref(), Some("Name"));
        assert_eq!(config.fields[1].aggregate, Some(Aggregate::Avg));
        assert_eq!(config.joins[0].kind, JoinKind::Left);
        assert_eq!(config.filters[0].value.as_deref(), Some("18"));
        assert_eq!(config.sort_by[0].direction, Direction::Desc);
        assert_eq!(config.limit, 10);
    }

    #[test]
    fn test_defaults_for_omitted_lists() {
        let config: ReportConfiguration =
            serde_json::from_str(r#"{ "tables": ["Residents"] }"#).unwrap();
        assert!(config.fields.is_empty());
        assert!(config.filters.is_empty());
        assert_eq!(config.limit, 0);
    }

    #[test]
    fn test_noise_filters_are_skipped() {
        let config = ReportConfiguration {
            tables: vec!["Residents".into()],
            filters: vec![
                FilterSpec::new("", "Age", "int", "IS_NULL"),
                FilterSpec::new("Residents", " ", "int", "IS_NULL"),
                FilterSpec::new("Residents", "Age", "int", "IS_NULL"),
            ],
            ..Default::default()
        };
        let active: Vec<_> = config.active_filters().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].column, "Age");
    }

    #[test]
    fn test_blank_filter_row_is_dropped() {
        let config: ReportConfiguration = serde_json::from_str(
            r#"{ "tables": ["Residents"], "filters": [{ "table": "", "column": "" }] }"#,
        )
        .unwrap();
        assert_eq!(config.filters.len(), 1);
        assert_eq!(config.filters[0].operator, "");
        assert_eq!(config.active_filters().count(), 0);
    }

    #[test]
    fn test_blank_primary_table() {
        let config = ReportConfiguration {
            tables: vec!["  ".into()],
            ..Default::default()
        };
        assert_eq!(config.primary_table(), None);
    }
}
