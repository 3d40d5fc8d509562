//! Query rewriting.
//!
//! Each rewrite rebuilds the statement head (`SELECT ... list`) and keeps
//! everything from `FROM` onward verbatim, so WHERE, JOIN, GROUP BY and
//! HAVING text is never touched. Output is built from normalized text:
//! comments, `USE`/`GO` and a leading CTE prologue are gone.

use crate::clauses::ClauseBoundaries;
use crate::preprocess::normalize;
use crate::splitter::keyword_at;

/// A normalized SELECT that has a FROM clause and a non-empty list.
struct Statement {
    text: String,
    bounds: ClauseBoundaries,
    from: usize,
}

impl Statement {
    fn parse(sql: &str) -> Option<Self> {
        let text = normalize(sql);
        let bounds = ClauseBoundaries::locate(&text)?;
        let from = bounds.from?;
        if bounds.select_list.is_empty() {
            return None;
        }
        Some(Self { text, bounds, from })
    }

    fn list(&self) -> &str {
        &self.text[self.bounds.select_list.clone()]
    }

    /// `FROM ...` up to and including any `;` tail.
    fn from_onward(&self) -> &str {
        &self.text[self.from..]
    }
}

/// Rewrite into a row count.
///
/// ```
/// use qail_lens::rewrite::to_count;
///
/// assert_eq!(
///     to_count("SELECT Id, Name FROM Users WHERE Active = 1").as_deref(),
///     Some("SELECT COUNT(*) FROM Users WHERE Active = 1")
/// );
/// assert_eq!(
///     to_count("SELECT DISTINCT City FROM Users").as_deref(),
///     Some("SELECT COUNT(*) FROM (SELECT DISTINCT City FROM Users) AS DistinctCount")
/// );
/// ```
pub fn to_count(sql: &str) -> Option<String> {
    let stmt = Statement::parse(sql)?;
    let end = stmt.bounds.end;

    if stmt.bounds.modifiers.distinct {
        return Some(format!(
            "SELECT COUNT(*) FROM ({}) AS DistinctCount{}",
            &stmt.text[..end],
            &stmt.text[end..]
        ));
    }
    Some(format!("SELECT COUNT(*) {}", stmt.from_onward()))
}

/// Limit to the first `n` rows. Existing TOP and DISTINCT modifiers are
/// dropped. `None` when `n` is not positive.
pub fn to_top(sql: &str, n: i64) -> Option<String> {
    if n <= 0 {
        return None;
    }
    let stmt = Statement::parse(sql)?;
    Some(format!("SELECT TOP {} {} {}", n, stmt.list(), stmt.from_onward()))
}

/// Make the projection distinct. Existing TOP and DISTINCT modifiers are dropped.
pub fn to_distinct(sql: &str) -> Option<String> {
    let stmt = Statement::parse(sql)?;
    Some(format!("SELECT DISTINCT {} {}", stmt.list(), stmt.from_onward()))
}

/// Replace the ORDER BY list with `clause`, keeping pagination and
/// `OPTION (...)` hints after it.
///
/// `clause` may already start with `ORDER BY`.
///
/// ```
/// use qail_lens::rewrite::to_order_by;
///
/// let sql = "SELECT * FROM Users ORDER BY Name ASC OFFSET 10 ROWS FETCH NEXT 20 ROWS ONLY";
/// assert_eq!(
///     to_order_by(sql, "Email DESC").as_deref(),
///     Some("SELECT * FROM Users ORDER BY Email DESC OFFSET 10 ROWS FETCH NEXT 20 ROWS ONLY")
/// );
/// ```
pub fn to_order_by(sql: &str, clause: &str) -> Option<String> {
    let clause = clause.trim();
    let clause = match keyword_at(clause, 0, "ORDER BY") {
        Some(end) => clause[end..].trim_start(),
        None => clause,
    };
    if clause.is_empty() {
        return None;
    }

    let stmt = Statement::parse(sql)?;
    let bounds = &stmt.bounds;
    let mut out = stmt.text[..bounds.suffix_start()].trim_end().to_string();
    out.push_str(" ORDER BY ");
    out.push_str(clause);
    for span in [&bounds.pagination, &bounds.trailer].into_iter().flatten() {
        out.push(' ');
        out.push_str(&stmt.text[span.clone()]);
    }
    out.push_str(&stmt.text[bounds.end..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_FROM: &[&str] = &["SELECT 1", "SELECT GETDATE() AS Now", "UPDATE t SET a = 1", "", "   "];

    #[test]
    fn test_missing_from_yields_none() {
        for sql in NO_FROM {
            assert_eq!(to_count(sql), None, "{sql}");
            assert_eq!(to_top(sql, 10), None, "{sql}");
            assert_eq!(to_distinct(sql), None, "{sql}");
            assert_eq!(to_order_by(sql, "a"), None, "{sql}");
        }
    }

    #[test]
    fn test_count_preserves_where_and_join() {
        let sql = "SELECT u.Name, r.Title FROM Users u INNER JOIN Roles r ON r.Id = u.RoleId WHERE u.Active = 1";
        let count = to_count(sql).unwrap();
        assert!(count.starts_with("SELECT COUNT(*) FROM Users u"));
        assert!(count.contains("INNER JOIN Roles r ON r.Id = u.RoleId"));
        assert!(count.contains("WHERE u.Active = 1"));
    }

    #[test]
    fn test_count_keeps_semicolon() {
        assert_eq!(
            to_count("SELECT DISTINCT a FROM t;").as_deref(),
            Some("SELECT COUNT(*) FROM (SELECT DISTINCT a FROM t) AS DistinctCount;")
        );
        assert_eq!(to_count("SELECT a FROM t;").as_deref(), Some("SELECT COUNT(*) FROM t;"));
    }

    #[test]
    fn test_top_replaces_existing_modifiers() {
        assert_eq!(
            to_top("SELECT DISTINCT TOP (3) a, b FROM t WHERE a > 1", 10).as_deref(),
            Some("SELECT TOP 10 a, b FROM t WHERE a > 1")
        );
        assert_eq!(to_top("SELECT a FROM t", 0), None);
        assert_eq!(to_top("SELECT a FROM t", -5), None);
    }

    #[test]
    fn test_top_and_distinct_idempotent() {
        let sql = "-- list\nSELECT TOP 5 u.Id, u.Name FROM Users u WHERE u.Active = 1 ORDER BY u.Name";
        let once = to_top(sql, 10).unwrap();
        assert_eq!(to_top(&once, 10).unwrap(), once);

        let once = to_distinct(sql).unwrap();
        assert_eq!(once, "SELECT DISTINCT u.Id, u.Name FROM Users u WHERE u.Active = 1 ORDER BY u.Name");
        assert_eq!(to_distinct(&once).unwrap(), once);
    }

    #[test]
    fn test_order_by_replaces_existing() {
        let sql = "SELECT * FROM t WHERE x = 1 ORDER BY a DESC";
        assert_eq!(
            to_order_by(sql, "b ASC").as_deref(),
            Some("SELECT * FROM t WHERE x = 1 ORDER BY b ASC")
        );
    }

    #[test]
    fn test_order_by_accepts_prefixed_clause() {
        let sql = "SELECT * FROM t";
        assert_eq!(to_order_by(sql, "order  by Id").as_deref(), Some("SELECT * FROM t ORDER BY Id"));
        assert_eq!(to_order_by(sql, "ORDER BY "), None);
        assert_eq!(to_order_by(sql, "  "), None);
    }

    #[test]
    fn test_order_by_keeps_hints_and_semicolon() {
        let sql = "SELECT a FROM t ORDER BY a OFFSET 0 ROWS OPTION (RECOMPILE);";
        assert_eq!(
            to_order_by(sql, "b").as_deref(),
            Some("SELECT a FROM t ORDER BY b OFFSET 0 ROWS OPTION (RECOMPILE);")
        );
    }

    #[test]
    fn test_order_by_ignores_window_order() {
        let sql = "SELECT ROW_NUMBER() OVER (ORDER BY Id) AS rn FROM t";
        assert_eq!(
            to_order_by(sql, "rn").as_deref(),
            Some("SELECT ROW_NUMBER() OVER (ORDER BY Id) AS rn FROM t ORDER BY rn")
        );
    }

    #[test]
    fn test_rewrites_see_through_cte() {
        let sql = "WITH a AS (SELECT 1 AS n) SELECT n FROM a";
        assert_eq!(to_count(sql).as_deref(), Some("SELECT COUNT(*) FROM a"));
    }
}
