//! SQLite dialect.
//!
//! SQLite accepts T-SQL style `[name]` identifiers, so report statements keep
//! bracket quoting. Row limits are a trailing `LIMIT n`.

use super::helpers;
use super::SqlDialect;

/// SQLite dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    // Uses default limit_style (trailing LIMIT)
}
