//! T-SQL (SQL Server / Azure SQL) dialect.
//!
//! Differences from ANSI that matter for report statements:
//! - Square bracket identifier quoting (`[name]`)
//! - TOP for simple limiting, placed right after SELECT

use super::helpers;
use super::{LimitStyle, SqlDialect};

/// T-SQL (SQL Server) dialect.
#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        // Plain '...' even for non-ASCII; report text must match byte for byte.
        helpers::quote_string_single(s)
    }

    fn limit_style(&self) -> LimitStyle {
        LimitStyle::TopRewrite
    }
}
