//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with square brackets.
/// Used by: T-SQL (SQL Server), SQLite (accepted for compatibility)
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
/// Used by: All dialects
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", escape_single_quotes(s))
}

/// Double every embedded single quote.
pub fn escape_single_quotes(s: &str) -> String {
    s.replace('\'', "''")
}

// =============================================================================
// Row Limiting
// =============================================================================

/// Emit a trailing `LIMIT n` clause.
/// Used by: SQLite
pub fn emit_limit_trailing(limit: u64) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Limit)
        .space()
        .push(Token::LitInt(limit));
    ts
}

/// Insert `TOP n` right after a leading `SELECT ` keyword.
///
/// Operates on finished statement text. Statements that do not literally
/// start with `"SELECT "` are returned unchanged.
/// Used by: T-SQL
pub fn insert_top(sql: &str, limit: u64) -> String {
    match sql.strip_prefix("SELECT ") {
        Some(rest) => format!("SELECT TOP {} {}", limit, rest),
        None => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::dialect::Dialect;

    #[test]
    fn test_quote_bracket_escapes_closing_bracket() {
        assert_eq!(quote_bracket("Residents"), "[Residents]");
        assert_eq!(quote_bracket("odd]name"), "[odd]]name]");
    }

    #[test]
    fn test_quote_string_single() {
        assert_eq!(quote_string_single("O'Brien"), "'O''Brien'");
        assert_eq!(quote_string_single(""), "''");
    }

    #[test]
    fn test_insert_top() {
        assert_eq!(
            insert_top("SELECT [T].[X] FROM [T]", 5),
            "SELECT TOP 5 [T].[X] FROM [T]"
        );
    }

    #[test]
    fn test_insert_top_requires_literal_prefix() {
        assert_eq!(insert_top("select [X] FROM [T]", 5), "select [X] FROM [T]");
        assert_eq!(insert_top(" SELECT [X] FROM [T]", 5), " SELECT [X] FROM [T]");
    }

    #[test]
    fn test_emit_limit_trailing() {
        assert_eq!(emit_limit_trailing(10).serialize(Dialect::Sqlite), "LIMIT 10");
        assert_eq!(
            emit_limit_trailing(u64::MAX).serialize(Dialect::Sqlite),
            "LIMIT 18446744073709551615"
        );
    }
}
