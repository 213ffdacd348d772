//! Expression AST for report statements.
//!
//! Column references, aggregate calls, literals and the predicate shapes a
//! report filter or join condition can take. Every variant is rendered by
//! `to_tokens_for_dialect()`; the compiler enforces exhaustive handling.

use super::dialect::Dialect;
use super::query::TableRef;
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<TableRef>,
        column: String,
    },

    /// Wildcard: * or table.*
    Star { table: Option<TableRef> },

    /// Literal values
    Literal(Literal),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Function call: name(args...)
    Function { name: String, args: Vec<Expr> },

    /// LIKE: expr LIKE pattern
    Like { expr: Box<Expr>, pattern: Box<Expr> },

    /// IN: expr IN (values...)
    In { expr: Box<Expr>, values: Vec<Expr> },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted and escaped for the target dialect.
    String(String),
    /// Emitted exactly as given. See [`Token::Raw`].
    Verbatim(String),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
}

fn binary_op_to_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
    }
}

impl Expr {
    /// Convert to tokens using the default dialect.
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert to tokens for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                if let Some(t) = table {
                    ts.append(&t.to_tokens());
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Star { table } => {
                if let Some(t) = table {
                    ts.append(&t.to_tokens());
                    ts.push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            Expr::Literal(lit) => {
                ts.push(match lit {
                    Literal::String(s) => Token::LitString(s.clone()),
                    Literal::Verbatim(s) => Token::Raw(s.clone()),
                });
            }

            Expr::BinaryOp { left, op, right } => {
                ts.append(&left.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(binary_op_to_token(*op));
                ts.space();
                ts.append(&right.to_tokens_for_dialect(dialect));
            }

            Expr::Function { name, args } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
            }

            Expr::Like { expr, pattern } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space().push(Token::Like).space();
                ts.append(&pattern.to_tokens_for_dialect(dialect));
            }

            Expr::In { expr, values } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space().push(Token::In).space().lparen();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&value.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
            }

            Expr::Between { expr, low, high } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space().push(Token::Between).space();
                ts.append(&low.to_tokens_for_dialect(dialect));
                ts.space().push(Token::And).space();
                ts.append(&high.to_tokens_for_dialect(dialect));
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }
        }

        ts
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }

    fn binary(self, op: BinaryOperator, other: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    pub fn ne(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Ne, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Lt, other)
    }

    pub fn lte(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Lte, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Gt, other)
    }

    pub fn gte(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Gte, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    pub fn like(self, pattern: Expr) -> Expr {
        Expr::Like {
            expr: Box::new(self),
            pattern: Box::new(pattern),
        }
    }

    pub fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self),
            values,
        }
    }

    pub fn between(self, low: Expr, high: Expr) -> Expr {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Column qualified by its table: `[table].[column]`.
pub fn table_col(table: &TableRef, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.clone()),
        column: column.into(),
    }
}

/// `[table].*`
pub fn table_star(table: &TableRef) -> Expr {
    Expr::Star {
        table: Some(table.clone()),
    }
}

/// Function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
    }
}

pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

/// Literal emitted without quoting or escaping.
pub fn lit_verbatim(s: &str) -> Expr {
    Expr::Literal(Literal::Verbatim(s.into()))
}
