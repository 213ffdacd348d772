//! Static read-only checks applied before a statement reaches a database.

use serde::{Deserialize, Serialize};
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

use super::GuardError;

/// Keywords that reject a statement wherever they appear.
///
/// Matching is by substring on the uppercased text, so an identifier such
/// as `CreatedAt` is rejected too.
pub const DENIED_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE", "EXEC", "EXECUTE",
];

/// How strictly statements are screened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Prefix and keyword denylist only.
    #[default]
    Denylist,
    /// Denylist, then a full parse that must yield a single query.
    Parsed,
}

/// Reject anything that is not a plain read.
pub fn check_read_only(sql: &str, mode: GuardMode) -> Result<(), GuardError> {
    check_denylist(sql)?;
    if mode == GuardMode::Parsed {
        check_parsed(sql)?;
    }
    Ok(())
}

fn check_denylist(sql: &str) -> Result<(), GuardError> {
    let normalized = sql.trim().to_uppercase();
    if !normalized.starts_with("SELECT") {
        return Err(GuardError::Rejected(
            "only SELECT statements may be executed".to_string(),
        ));
    }
    if let Some(keyword) = DENIED_KEYWORDS.iter().find(|k| normalized.contains(*k)) {
        return Err(GuardError::Rejected(format!(
            "statement contains forbidden keyword {}",
            keyword
        )));
    }
    Ok(())
}

fn check_parsed(sql: &str) -> Result<(), GuardError> {
    let statements = Parser::parse_sql(&MsSqlDialect {}, sql)
        .map_err(|e| GuardError::Rejected(format!("statement does not parse: {}", e)))?;

    match statements.as_slice() {
        [Statement::Query(query)] if is_pure_query(query) => Ok(()),
        [Statement::Query(_)] => Err(GuardError::Rejected(
            "query writes data or contains a non-query body".to_string(),
        )),
        [_] => Err(GuardError::Rejected("statement is not a query".to_string())),
        other => Err(GuardError::Rejected(format!(
            "expected exactly one statement, found {}",
            other.len()
        ))),
    }
}

fn is_pure_query(query: &Query) -> bool {
    let ctes_ok = query
        .with
        .as_ref()
        .map_or(true, |with| with.cte_tables.iter().all(|cte| is_pure_query(&cte.query)));
    ctes_ok && is_pure_body(&query.body)
}

fn is_pure_body(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(query) => is_pure_query(query),
        SetExpr::SetOperation { left, right, .. } => is_pure_body(left) && is_pure_body(right),
        SetExpr::Values(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_select_any_case() {
        check_read_only("  select [T].[X] from [T]", GuardMode::Denylist).unwrap();
        check_read_only("SELECT TOP 5 * FROM [T]", GuardMode::Parsed).unwrap();
    }

    #[test]
    fn test_rejects_non_select_prefix() {
        let err = check_read_only("WITH x AS (SELECT 1) SELECT * FROM x", GuardMode::Denylist)
            .unwrap_err();
        assert!(matches!(err, GuardError::Rejected(_)));
    }

    #[test]
    fn test_rejects_denied_keywords() {
        for sql in [
            "DROP TABLE Residents",
            "UPDATE x SET y = 1",
            "SELECT 1; DELETE FROM Residents",
            "select * from t; exec sp_who",
        ] {
            assert!(
                check_read_only(sql, GuardMode::Denylist).is_err(),
                "should reject: {sql}"
            );
        }
    }

    #[test]
    fn test_substring_match_is_conservative() {
        let err = check_read_only("SELECT [T].[CreatedAt] FROM [T]", GuardMode::Denylist)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "statement rejected: statement contains forbidden keyword CREATE"
        );
    }

    #[test]
    fn test_parsed_mode_rejects_select_into() {
        check_read_only("SELECT [T].[X] FROM [T]", GuardMode::Denylist).unwrap();
        let err = check_read_only("SELECT [X] INTO [Copy] FROM [T]", GuardMode::Parsed)
            .unwrap_err();
        assert!(matches!(err, GuardError::Rejected(_)));
        // Denylist alone lets it through.
        check_read_only("SELECT [X] INTO [Copy] FROM [T]", GuardMode::Denylist).unwrap();
    }

    #[test]
    fn test_parsed_mode_rejects_multiple_statements() {
        let err = check_read_only("SELECT 1; SELECT 2", GuardMode::Parsed).unwrap_err();
        assert!(err.to_string().contains("exactly one statement"));
    }

    #[test]
    fn test_parsed_mode_accepts_union() {
        check_read_only(
            "SELECT [A].[X] FROM [A] UNION ALL SELECT [B].[X] FROM [B]",
            GuardMode::Parsed,
        )
        .unwrap();
    }

    #[test]
    fn test_guard_mode_from_toml_value() {
        let mode: GuardMode = serde_json::from_str("\"parsed\"").unwrap();
        assert_eq!(mode, GuardMode::Parsed);
        assert_eq!(GuardMode::default(), GuardMode::Denylist);
    }
}
