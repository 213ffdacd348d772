//! Filter clause compiler.
//!
//! Turns one [`FilterSpec`] into one boolean SQL predicate. String-typed
//! columns (declared type containing `CHAR` or `TEXT`) get quoted, escaped
//! literals; every other declared type is emitted verbatim.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::FilterSpec;
use crate::sql::dialect::Dialect;
use crate::sql::expr::{lit_str, lit_verbatim, table_col, Expr};
use crate::sql::query::TableRef;

static NUMERIC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap());

/// Errors from compiling a single filter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("filter on column '{column}' with operator {operator} requires a value")]
    MissingValue { column: String, operator: String },

    #[error("BETWEEN filter on column '{column}' needs two values separated by '|', got '{value}'")]
    MalformedBetween { column: String, value: String },

    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    #[error("filter value '{value}' for column '{column}' is not a numeric literal")]
    NotNumeric { column: String, value: String },
}

/// Filter operator taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    IsNull,
    IsNotNull,
    In,
    Between,
}

impl FilterOperator {
    /// Parse an operator name or symbol, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "EQUALS" | "=" => Self::Equals,
            "NOT_EQUALS" | "!=" | "<>" => Self::NotEquals,
            "CONTAINS" | "LIKE" => Self::Contains,
            "STARTS_WITH" => Self::StartsWith,
            "ENDS_WITH" => Self::EndsWith,
            "GREATER_THAN" | ">" => Self::GreaterThan,
            "GREATER_THAN_OR_EQUAL" | ">=" => Self::GreaterThanOrEqual,
            "LESS_THAN" | "<" => Self::LessThan,
            "LESS_THAN_OR_EQUAL" | "<=" => Self::LessThanOrEqual,
            "IS_NULL" => Self::IsNull,
            "IS_NOT_NULL" => Self::IsNotNull,
            "IN" => Self::In,
            "BETWEEN" => Self::Between,
            _ => return None,
        };
        Some(op)
    }

    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::Contains => "CONTAINS",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Self::LessThan => "LESS_THAN",
            Self::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Self::IsNull => "IS_NULL",
            Self::IsNotNull => "IS_NOT_NULL",
            Self::In => "IN",
            Self::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a declared type name denotes a string column.
pub(crate) fn is_string_type(declared_type: &str) -> bool {
    let upper = declared_type.to_ascii_uppercase();
    upper.contains("CHAR") || upper.contains("TEXT") || upper.contains("VARCHAR")
}

/// Literal builder for one filter.
struct Literals<'a> {
    column: &'a str,
    string_typed: bool,
    strict_numeric: bool,
}

impl Literals<'_> {
    /// Quoted when string-typed, verbatim otherwise.
    fn typed(&self, value: &str) -> Result<Expr, FilterError> {
        if self.string_typed {
            Ok(lit_str(value))
        } else {
            self.verbatim(value)
        }
    }

    /// Always verbatim.
    fn verbatim(&self, value: &str) -> Result<Expr, FilterError> {
        if self.strict_numeric && !NUMERIC_LITERAL.is_match(value) {
            return Err(FilterError::NotNumeric {
                column: self.column.to_string(),
                value: value.to_string(),
            });
        }
        Ok(lit_verbatim(value))
    }
}

/// Build the predicate expression for one filter.
///
/// With `strict_numeric` set, every value emitted verbatim must look like
/// `-?digits[.digits]`.
pub fn filter_expr(filter: &FilterSpec, strict_numeric: bool) -> Result<Expr, FilterError> {
    let op = FilterOperator::parse(&filter.operator)
        .ok_or_else(|| FilterError::UnknownOperator(filter.operator.clone()))?;

    let column = table_col(&TableRef::parse(&filter.table), &filter.column);

    let value = match filter.value.as_deref() {
        Some(v) if !v.is_empty() => v,
        _ if op.requires_value() => {
            return Err(FilterError::MissingValue {
                column: filter.column.clone(),
                operator: op.to_string(),
            })
        }
        _ => "",
    };

    let lits = Literals {
        column: &filter.column,
        string_typed: is_string_type(&filter.declared_type),
        strict_numeric,
    };

    let expr = match op {
        FilterOperator::Equals => column.eq(lits.typed(value)?),
        FilterOperator::NotEquals => column.ne(lits.typed(value)?),
        FilterOperator::Contains => column.like(lit_str(&format!("%{}%", value))),
        FilterOperator::StartsWith => column.like(lit_str(&format!("{}%", value))),
        FilterOperator::EndsWith => column.like(lit_str(&format!("%{}", value))),
        FilterOperator::GreaterThan => column.gt(lits.verbatim(value)?),
        FilterOperator::GreaterThanOrEqual => column.gte(lits.verbatim(value)?),
        FilterOperator::LessThan => column.lt(lits.verbatim(value)?),
        FilterOperator::LessThanOrEqual => column.lte(lits.verbatim(value)?),
        FilterOperator::IsNull => column.is_null(),
        FilterOperator::IsNotNull => column.is_not_null(),
        FilterOperator::In => {
            let values = value
                .split(',')
                .map(|v| lits.typed(v.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            column.in_list(values)
        }
        FilterOperator::Between => {
            let parts: Vec<&str> = value.split('|').collect();
            let [low, high] = parts.as_slice() else {
                return Err(FilterError::MalformedBetween {
                    column: filter.column.clone(),
                    value: value.to_string(),
                });
            };
            column.between(lits.typed(low.trim())?, lits.typed(high.trim())?)
        }
    };

    Ok(expr)
}

/// Compile one filter to its SQL fragment.
pub fn compile_filter(filter: &FilterSpec, dialect: Dialect) -> Result<String, FilterError> {
    filter_expr(filter, false).map(|expr| expr.to_sql(dialect))
}
