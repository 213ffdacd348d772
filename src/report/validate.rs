//! Checks a report's table and column references against a live catalog.

use std::collections::HashMap;

use futures::future::join_all;
use thiserror::Error;
use tracing::debug;

use super::ReportConfiguration;
use crate::backend::{BackendError, SchemaCatalog};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {table}.{column}")]
    UnknownColumn { table: String, column: String },

    #[error("catalog lookup failed: {0}")]
    Catalog(#[from] BackendError),
}

/// Every `(table, column)` pair the report touches, in first-seen order.
///
/// Covers fields, both sides of each join, surviving filters, group keys
/// and sort keys. Names are trimmed; blank pairs are skipped.
pub fn referenced_columns(config: &ReportConfiguration) -> Vec<(String, String)> {
    let fields = config.fields.iter().map(|f| (&f.table, &f.column));
    let joins = config.joins.iter().flat_map(|j| {
        [
            (&j.left_table, &j.left_column),
            (&j.right_table, &j.right_column),
        ]
    });
    let filters = config.active_filters().map(|f| (&f.table, &f.column));
    let groups = config.group_by.iter().map(|g| (&g.table, &g.column));
    let sorts = config.sort_by.iter().map(|s| (&s.table, &s.column));

    let mut seen = Vec::new();
    for (table, column) in fields.chain(joins).chain(filters).chain(groups).chain(sorts) {
        let pair = (table.trim().to_string(), column.trim().to_string());
        if pair.0.is_empty() || pair.1.is_empty() || seen.contains(&pair) {
            continue;
        }
        seen.push(pair);
    }
    seen
}

fn referenced_tables(config: &ReportConfiguration, columns: &[(String, String)]) -> Vec<String> {
    let mut tables: Vec<String> = Vec::new();
    let names = config
        .tables
        .iter()
        .map(|t| t.trim())
        .chain(columns.iter().map(|(t, _)| t.as_str()));
    for name in names {
        if !name.is_empty() && !tables.iter().any(|t| t.eq_ignore_ascii_case(name)) {
            tables.push(name.to_string());
        }
    }
    tables
}

/// Find the catalog entry for a report table name.
///
/// Exact matches win; otherwise an unqualified name matches the table part
/// of a `schema.table` catalog entry.
fn resolve<'a>(name: &str, catalog: &'a [String]) -> Option<&'a str> {
    catalog
        .iter()
        .find(|c| c.eq_ignore_ascii_case(name))
        .or_else(|| {
            catalog.iter().find(|c| {
                c.split_once('.')
                    .is_some_and(|(_, table)| table.eq_ignore_ascii_case(name))
            })
        })
        .map(String::as_str)
}

/// Fail with the first unknown table or column the report references.
pub async fn validate_against_catalog<C>(
    config: &ReportConfiguration,
    catalog: &C,
) -> Result<(), ValidationError>
where
    C: SchemaCatalog + ?Sized,
{
    let columns = referenced_columns(config);
    let tables = referenced_tables(config, &columns);
    if tables.is_empty() {
        return Ok(());
    }

    let known_tables = catalog.list_tables().await?;
    let mut resolved = Vec::with_capacity(tables.len());
    for table in &tables {
        match resolve(table, &known_tables) {
            Some(name) => resolved.push((table.to_ascii_lowercase(), name.to_string())),
            None => return Err(ValidationError::UnknownTable(table.clone())),
        }
    }

    let lookups = resolved.iter().map(|(_, name)| catalog.list_columns(name));
    let mut known_columns: HashMap<String, Vec<String>> = HashMap::new();
    for ((key, _), listed) in resolved.iter().zip(join_all(lookups).await) {
        let names = listed?.into_iter().map(|c| c.name).collect();
        known_columns.insert(key.clone(), names);
    }

    for (table, column) in &columns {
        let found = known_columns
            .get(&table.to_ascii_lowercase())
            .is_some_and(|names| names.iter().any(|n| n.eq_ignore_ascii_case(column)));
        if !found {
            return Err(ValidationError::UnknownColumn {
                table: table.clone(),
                column: column.clone(),
            });
        }
    }

    debug!(
        tables = tables.len(),
        columns = columns.len(),
        "report references validated"
    );
    Ok(())
}
