//! SQL generation module.
//!
//! A small type-safe SQL builder for the statements a report compiles to:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and constructors
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - T-SQL and SQLite dialect implementations

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, LimitStyle, SqlDialect};
pub use expr::{
    func, lit_str, lit_verbatim, table_col, table_star, BinaryOperator, Expr, Literal,
};
pub use query::{Join, JoinType, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use token::{Token, TokenStream};
