//! SQL statement compiler.
//!
//! `compile` is pure: no I/O, no catalog access. Clause order is fixed:
//! SELECT, FROM, JOIN, WHERE, GROUP BY, ORDER BY, then the row limit.

use thiserror::Error;
use tracing::debug;

use super::filter::{filter_expr, FilterError};
use super::ReportConfiguration;
use crate::sql::dialect::Dialect;
use crate::sql::expr::{func, table_col, table_star, Expr};
use crate::sql::query::{OrderByExpr, Query, SelectExpr, TableRef};

/// Errors from compiling a report configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("report configuration must select at least one table")]
    NoTables,

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Knobs for compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub dialect: Dialect,
    /// Reject non-numeric text in verbatim filter values.
    pub strict_numeric_literals: bool,
}

impl CompileOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            strict_numeric_literals: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_numeric_literals = strict;
        self
    }
}

/// Compile a configuration to T-SQL with default options.
pub fn compile(config: &ReportConfiguration) -> Result<String, CompileError> {
    compile_with(config, CompileOptions::default())
}

/// Compile a configuration with explicit options.
pub fn compile_with(
    config: &ReportConfiguration,
    options: CompileOptions,
) -> Result<String, CompileError> {
    let query = build_query(config, options.strict_numeric_literals)?;
    let sql = query.to_sql(options.dialect);
    debug!(dialect = ?options.dialect, sql = %sql, "compiled report");
    Ok(sql)
}

/// Build the query AST for a configuration.
pub(crate) fn build_query(
    config: &ReportConfiguration,
    strict_numeric: bool,
) -> Result<Query, CompileError> {
    let primary = config.primary_table().ok_or(CompileError::NoTables)?;
    let from = TableRef::parse(primary);

    // SELECT list
    let select: Vec<SelectExpr> = if config.fields.is_empty() {
        vec![SelectExpr::new(table_star(&from))]
    } else {
        config
            .fields
            .iter()
            .map(|field| {
                let column = table_col(&TableRef::parse(&field.table), &field.column);
                let expr = match field.aggregate {
                    Some(agg) => func(agg.function_name(), vec![column]),
                    None => column,
                };
                match &field.alias {
                    Some(alias) if !alias.is_empty() => SelectExpr::new(expr).with_alias(alias),
                    _ => SelectExpr::new(expr),
                }
            })
            .collect()
    };

    let mut query = Query::new().select(select).from(from);

    // JOINs, in the given order
    for join in &config.joins {
        let right = TableRef::parse(&join.right_table);
        let on = table_col(&TableRef::parse(&join.left_table), &join.left_column)
            .eq(table_col(&right, &join.right_column));
        query = query.join(join.kind.into(), right, on);
    }

    // WHERE: one predicate per surviving filter, ANDed
    for filter in config.active_filters() {
        query = query.filter(filter_expr(filter, strict_numeric)?);
    }

    // GROUP BY
    let group_by: Vec<Expr> = config
        .group_by
        .iter()
        .map(|key| table_col(&TableRef::parse(&key.table), &key.column))
        .collect();

    // ORDER BY
    let order_by: Vec<OrderByExpr> = config
        .sort_by
        .iter()
        .map(|sort| OrderByExpr {
            expr: table_col(&TableRef::parse(&sort.table), &sort.column),
            dir: sort.direction.into(),
        })
        .collect();

    Ok(query
        .group_by(group_by)
        .order_by(order_by)
        .limit(config.limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{
        Aggregate, Direction, FieldSpec, FilterSpec, GroupKey, JoinKind, JoinSpec, SortSpec,
    };
    use crate::sql::test_utils::validate_sql;

    fn residents_report() -> ReportConfiguration {
        ReportConfiguration {
            tables: vec!["Residents".into()],
            fields: vec![
                FieldSpec::new("Residents", "FirstName"),
                FieldSpec::new("Residents", "LastName"),
            ],
            filters: vec![
                FilterSpec::new("Residents", "Gender", "varchar", "EQUALS").with_value("Female")
            ],
            sort_by: vec![SortSpec::new("Residents", "LastName", Direction::Asc)],
            ..Default::default()
        }
    }

    #[test]
    fn test_residents_report() {
        let sql = compile(&residents_report()).unwrap();
        insta::assert_snapshot!(sql, @"SELECT [Residents].[FirstName], [Residents].[LastName] FROM [Residents] WHERE [Residents].[Gender] = 'Female' ORDER BY [Residents].[LastName] ASC");
        validate_sql(&sql, Dialect::TSql).unwrap();
    }

    #[test]
    fn test_no_tables() {
        let config = ReportConfiguration::default();
        assert_eq!(compile(&config), Err(CompileError::NoTables));
    }

    #[test]
    fn test_empty_fields_select_star() {
        let config = ReportConfiguration {
            tables: vec!["Residents".into(), "Households".into()],
            ..Default::default()
        };
        assert_eq!(compile(&config).unwrap(), "SELECT [Residents].* FROM [Residents]");
    }

    #[test]
    fn test_aggregates_and_aliases() {
        let config = ReportConfiguration {
            tables: vec!["Residents".into()],
            fields: vec![
                FieldSpec::new("Residents", "Zone"),
                FieldSpec::new("Residents", "Id")
                    .with_aggregate(Aggregate::Count)
                    .with_alias("Total"),
                FieldSpec::new("Residents", "Age").with_aggregate(Aggregate::Avg),
            ],
            group_by: vec![GroupKey::new("Residents", "Zone")],
            ..Default::default()
        };
        let sql = compile(&config).unwrap();
        insta::assert_snapshot!(sql, @"SELECT [Residents].[Zone], COUNT([Residents].[Id]) AS [Total], AVG([Residents].[Age]) FROM [Residents] GROUP BY [Residents].[Zone]");
        validate_sql(&sql, Dialect::TSql).unwrap();
    }

    #[test]
    fn test_joins_in_order() {
        let config = ReportConfiguration {
            tables: vec!["Residents".into(), "Households".into(), "Zones".into()],
            fields: vec![
                FieldSpec::new("Residents", "FirstName"),
                FieldSpec::new("Zones", "Name").with_alias("Zone"),
            ],
            joins: vec![
                JoinSpec {
                    kind: JoinKind::Inner,
                    left_table: "Residents".into(),
                    left_column: "HouseholdId".into(),
                    right_table: "Households".into(),
                    right_column: "Id".into(),
                },
                JoinSpec {
                    kind: JoinKind::Left,
                    left_table: "Households".into(),
                    left_column: "ZoneId".into(),
                    right_table: "Zones".into(),
                    right_column: "Id".into(),
                },
            ],
            ..Default::default()
        };
        let sql = compile(&config).unwrap();
        insta::assert_snapshot!(sql, @"SELECT [Residents].[FirstName], [Zones].[Name] AS [Zone] FROM [Residents] INNER JOIN [Households] ON [Residents].[HouseholdId] = [Households].[Id] LEFT JOIN [Zones] ON [Households].[ZoneId] = [Zones].[Id]");
        validate_sql(&sql, Dialect::TSql).unwrap();
    }

    #[test]
    fn test_limit_per_dialect() {
        let mut config = residents_report();
        config.limit = 5;

        let tsql = compile_with(&config, CompileOptions::new(Dialect::TSql)).unwrap();
        assert!(tsql.starts_with("SELECT TOP 5 [Residents].[FirstName]"));
        validate_sql(&tsql, Dialect::TSql).unwrap();

        let sqlite = compile_with(&config, CompileOptions::new(Dialect::Sqlite)).unwrap();
        assert!(sqlite.ends_with("ORDER BY [Residents].[LastName] ASC LIMIT 5"));
        validate_sql(&sqlite, Dialect::Sqlite).unwrap();
    }

    #[test]
    fn test_filter_error_aborts_compile() {
        let mut config = residents_report();
        config
            .filters
            .push(FilterSpec::new("Residents", "Age", "int", "BETWEEN").with_value("10"));
        assert!(matches!(
            compile(&config),
            Err(CompileError::Filter(FilterError::MalformedBetween { .. }))
        ));
    }

    #[test]
    fn test_noise_filters_never_reach_compiler() {
        let mut config = residents_report();
        config.filters.push(FilterSpec::new("", "", "", "NOT_AN_OPERATOR"));
        assert_eq!(compile(&config).unwrap(), compile(&residents_report()).unwrap());
    }

    #[test]
    fn test_strict_numeric_option() {
        let mut config = residents_report();
        config
            .filters
            .push(FilterSpec::new("Residents", "Age", "int", ">").with_value("1; --"));
        assert!(compile(&config).is_ok());
        assert!(matches!(
            compile_with(&config, CompileOptions::default().strict(true)),
            Err(CompileError::Filter(FilterError::NotNumeric { .. }))
        ));
    }
}
