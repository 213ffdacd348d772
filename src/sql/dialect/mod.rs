//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for the dialect differences
//! that show up in report statements:
//!
//! - Identifier quoting: `[]` for both T-SQL and SQLite
//! - Row limiting: `TOP n` after SELECT vs trailing `LIMIT n`
//!
//! # Usage
//!
//! ```ignore
//! use tabula::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::TSql;
//! let quoted = dialect.quote_identifier("Residents");  // [Residents]
//! ```

pub mod helpers;
mod sqlite;
mod tsql;

pub use sqlite::Sqlite;
pub use tsql::TSql;

use serde::{Deserialize, Serialize};

use super::token::TokenStream;

/// Where a dialect puts the row limit of a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStyle {
    /// `... LIMIT n` emitted as the last clause.
    Trailing,
    /// `SELECT TOP n ...`, inserted into the finished statement text.
    TopRewrite,
}

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// How the row limit is attached to a statement.
    fn limit_style(&self) -> LimitStyle {
        LimitStyle::Trailing
    }

    /// Emit a trailing limit clause. Only consulted for [`LimitStyle::Trailing`].
    fn emit_limit(&self, limit: u64) -> TokenStream {
        helpers::emit_limit_trailing(limit)
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    TSql,
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::TSql => &TSql,
            Dialect::Sqlite => &Sqlite,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn limit_style(&self) -> LimitStyle {
        self.dialect().limit_style()
    }

    fn emit_limit(&self, limit: u64) -> TokenStream {
        self.dialect().emit_limit(limit)
    }
}
