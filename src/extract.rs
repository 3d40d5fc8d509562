//! Extraction operations.
//!
//! Every function normalizes its input first and degrades to `None` or an
//! empty `Vec` on input it does not apply to. Fragments that match no known
//! shape are dropped one at a time; the rest are still reported.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{ColumnInfo, ColumnReference, QueryAnalysis, WhereCondition, WhereOperator};
use crate::clauses::ClauseBoundaries;
use crate::ident::QualifiedIdent;
use crate::patterns::{
    database_patterns, match_names, table_name_patterns, MatchBudget, DOT, PART_BARE, PART_BRACKET,
    PART_QUOTED,
};
use crate::preprocess::normalize;
use crate::resolver::{resolve_column, strip_outer_parens};
use crate::splitter::{split_columns, split_predicates};

/// `column <op> value`. Word operators need whitespace before them so
/// `LoginIS NULL` is not read as `Login IS NULL`.
static CONDITION: Lazy<Regex> = Lazy::new(|| {
    let part = format!("(?:{}|{}|{})", PART_BRACKET, PART_QUOTED, PART_BARE);
    Regex::new(&format!(
        r"(?is)^(?P<column>{part}(?:{DOT}{part})*)(?:\s*(?P<symbol><>|!=|>=|<=|=|>|<)|\s+(?P<word>IS\s+NOT|NOT\s+IN|NOT\s+LIKE|IS|IN|LIKE)\b)\s*(?P<value>.*\S)\s*$"
    ))
    .expect("condition regex is valid")
});

/// Database names referenced anywhere in `sql`, in text order, de-duplicated
/// case-insensitively (the first spelling wins).
pub fn database_names(sql: &str, budget: MatchBudget) -> Vec<String> {
    database_names_in(&normalize(sql), budget)
}

fn database_names_in(text: &str, budget: MatchBudget) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for found in match_names(text, database_patterns(), budget) {
        let Some(db) = found.database() else {
            continue;
        };
        if !names.iter().any(|n| n.eq_ignore_ascii_case(db)) {
            names.push(db.to_string());
        }
    }
    names
}

/// The first table named after `FROM` or `JOIN`.
pub fn first_table_name(sql: &str, budget: MatchBudget) -> Option<String> {
    first_table_name_in(&normalize(sql), budget)
}

fn first_table_name_in(text: &str, budget: MatchBudget) -> Option<String> {
    match_names(text, table_name_patterns(), budget)
        .into_iter()
        .find(|found| {
            let call = found.is_function_call(text);
            if call {
                tracing::debug!(name = &text[found.span.clone()], "table-valued function; skipped");
            }
            !call
        })
        .map(|found| found.table().to_string())
}

/// Resolved SELECT-list columns.
pub fn column_details(sql: &str) -> Vec<ColumnReference> {
    let text = normalize(sql);
    match ClauseBoundaries::locate(&text) {
        Some(bounds) => columns_in(&text, &bounds),
        None => Vec::new(),
    }
}

fn columns_in(text: &str, bounds: &ClauseBoundaries) -> Vec<ColumnReference> {
    split_columns(&text[bounds.select_list.clone()])
        .iter()
        .filter_map(|fragment| {
            let resolved = resolve_column(fragment);
            if resolved.is_none() {
                tracing::debug!(fragment = %fragment, "select item not reported");
            }
            resolved
        })
        .collect()
}

/// Simple `column <op> value` predicates of the top-level WHERE clause.
///
/// Parenthesized groups are flattened; predicates of any other shape
/// (`NOT (...)`, `EXISTS (...)`, `a BETWEEN 1 AND 2`) are skipped.
pub fn where_conditions(sql: &str) -> Vec<WhereCondition> {
    let text = normalize(sql);
    match ClauseBoundaries::locate(&text) {
        Some(bounds) => conditions_in(&text, &bounds),
        None => Vec::new(),
    }
}

fn conditions_in(text: &str, bounds: &ClauseBoundaries) -> Vec<WhereCondition> {
    let Some(predicate) = bounds.where_predicate.clone() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    collect_conditions(&text[predicate], &mut out);
    out
}

fn collect_conditions(predicate: &str, out: &mut Vec<WhereCondition>) {
    for fragment in split_predicates(predicate) {
        let inner = strip_outer_parens(&fragment);
        if inner.len() != fragment.len() && split_predicates(inner).len() > 1 {
            collect_conditions(inner, out);
            continue;
        }
        match parse_condition(inner) {
            Some(condition) => out.push(condition),
            None => tracing::debug!(fragment = %fragment, "predicate not reported"),
        }
    }
}

fn parse_condition(fragment: &str) -> Option<WhereCondition> {
    let caps = CONDITION.captures(fragment)?;
    let column = QualifiedIdent::parse(caps.name("column")?.as_str())?;
    let operator = caps
        .name("symbol")
        .or_else(|| caps.name("word"))
        .and_then(|m| WhereOperator::from_sql(m.as_str()))?;
    let value = caps.name("value")?.as_str().to_string();

    Some(WhereCondition {
        column: ColumnInfo::new(column.parts().join("."), None),
        operator,
        value,
    })
}

/// The ORDER BY list, without the keyword and without pagination.
pub fn order_by(sql: &str) -> Option<String> {
    crate::clauses::order_by_clause(sql)
}

/// Everything above in one pass over one normalized copy of `sql`.
/// `None` unless `sql` is a SELECT.
pub fn analyze(sql: &str, budget: MatchBudget) -> Option<QueryAnalysis> {
    let text = normalize(sql);
    let bounds = ClauseBoundaries::locate(&text)?;
    let slice = |span: Option<&std::ops::Range<usize>>| {
        span.map(|r| text[r.clone()].to_string()).filter(|s| !s.is_empty())
    };

    Some(QueryAnalysis {
        databases: database_names_in(&text, budget),
        table: first_table_name_in(&text, budget),
        columns: columns_in(&text, &bounds),
        conditions: conditions_in(&text, &bounds),
        order_by: slice(bounds.order_list.as_ref()),
        pagination: slice(bounds.pagination.as_ref()),
        modifiers: bounds.modifiers.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> MatchBudget {
        MatchBudget::default()
    }

    fn cond(column: &str, operator: WhereOperator, value: &str) -> WhereCondition {
        WhereCondition {
            column: ColumnInfo::new(column, None),
            operator,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_database_names_dedup_case_insensitive() {
        let sql = "SELECT * FROM [MyDB].[dbo].[Users] u JOIN mydb.dbo.Roles r ON r.Id = u.RoleId \
                   JOIN [Other].[dbo].[Orders] o ON o.UserId = u.Id";
        assert_eq!(database_names(sql, budget()), vec!["MyDB", "Other"]);
    }

    #[test]
    fn test_database_names_from_dml() {
        let sql = "INSERT INTO Archive.dbo.Orders SELECT * FROM Live..Orders";
        assert_eq!(database_names(sql, budget()), vec!["Archive", "Live"]);
        assert!(database_names("SELECT * FROM dbo.Users", budget()).is_empty());
    }

    #[test]
    fn test_database_names_ignore_comments() {
        let sql = "-- FROM Old.dbo.Users\nSELECT * FROM New.dbo.Users";
        assert_eq!(database_names(sql, budget()), vec!["New"]);
    }

    #[test]
    fn test_first_table_name() {
        let sql = "SELECT * FROM [MyDB].[dbo].[Users] WHERE Active=1";
        assert_eq!(first_table_name(sql, budget()).as_deref(), Some("Users"));
        assert_eq!(first_table_name("SELECT 1", budget()), None);
    }

    #[test]
    fn test_first_table_name_skips_function() {
        let sql = "SELECT * FROM dbo.fn_Users(1) f JOIN Roles r ON r.Id = f.RoleId";
        assert_eq!(first_table_name(sql, budget()).as_deref(), Some("Roles"));
    }

    #[test]
    fn test_column_details() {
        let cols = column_details("SELECT u.Name, u.Email AS EmailAddress, COUNT(*) AS Total FROM Users u");
        assert_eq!(
            cols,
            vec![
                ColumnReference::new(None, Some("u"), "Name", None),
                ColumnReference::new(None, Some("u"), "Email", Some("EmailAddress".into())),
                ColumnReference::new(None, None, "COUNT", Some("Total".into())),
            ]
        );
    }

    #[test]
    fn test_column_details_drops_literals_only() {
        let cols = column_details("SELECT 1, 'x', Id FROM t");
        assert_eq!(cols, vec![ColumnReference::new(None, None, "Id", None)]);
        assert!(column_details("UPDATE t SET a = 1").is_empty());
    }

    #[test]
    fn test_where_is_null() {
        let conds = where_conditions("SELECT * FROM Users WHERE DeletedDate IS NULL");
        assert_eq!(conds, vec![cond("DeletedDate", WhereOperator::Is, "NULL")]);
    }

    #[test]
    fn test_where_mixed_operators() {
        let sql = "SELECT * FROM Users u WHERE u.Age >= @minAge AND [u].[Name] LIKE N'A%' \
                   OR u.Role NOT IN (1, 2) AND u.Email IS NOT NULL AND u.Id<>5";
        assert_eq!(
            where_conditions(sql),
            vec![
                cond("u.Age", WhereOperator::Gte, "@minAge"),
                cond("u.Name", WhereOperator::Like, "N'A%'"),
                cond("u.Role", WhereOperator::NotIn, "(1, 2)"),
                cond("u.Email", WhereOperator::IsNot, "NULL"),
                cond("u.Id", WhereOperator::Ne, "5"),
            ]
        );
    }

    #[test]
    fn test_where_groups_flattened_and_unknown_dropped() {
        let sql = "SELECT * FROM t WHERE (a = 1 OR b = 2) AND NOT c = 3 AND d BETWEEN 1 AND 5 AND e != 'x'";
        assert_eq!(
            where_conditions(sql),
            vec![
                cond("a", WhereOperator::Eq, "1"),
                cond("b", WhereOperator::Eq, "2"),
                cond("e", WhereOperator::NotEq, "'x'"),
            ]
        );
    }

    #[test]
    fn test_where_stops_at_order_by() {
        let sql = "SELECT * FROM t WHERE a = 1 ORDER BY a";
        assert_eq!(where_conditions(sql), vec![cond("a", WhereOperator::Eq, "1")]);
        assert!(where_conditions("SELECT * FROM t").is_empty());
    }

    #[test]
    fn test_order_by() {
        let sql = "SELECT * FROM Users ORDER BY Name ASC, Id DESC OFFSET 5 ROWS";
        assert_eq!(order_by(sql).as_deref(), Some("Name ASC, Id DESC"));
    }

    #[test]
    fn test_analyze() {
        let sql = "SELECT DISTINCT TOP 5 u.Name FROM Sales.dbo.Users u WHERE u.Active = 1 \
                   ORDER BY u.Name OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY";
        let analysis = analyze(sql, budget()).unwrap();
        assert_eq!(analysis.databases, vec!["Sales"]);
        assert_eq!(analysis.table.as_deref(), Some("Users"));
        assert_eq!(analysis.columns, vec![ColumnReference::new(None, Some("u"), "Name", None)]);
        assert_eq!(analysis.conditions, vec![cond("u.Active", WhereOperator::Eq, "1")]);
        assert_eq!(analysis.order_by.as_deref(), Some("u.Name"));
        assert_eq!(analysis.pagination.as_deref(), Some("OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"));
        assert!(analysis.modifiers.distinct);
        assert_eq!(analysis.modifiers.top.as_deref(), Some("TOP 5"));

        assert!(analyze("DELETE FROM t", budget()).is_none());
    }
}
