//! SELECT-list expression resolution.
//!
//! [`resolve_column`] turns one SELECT-list fragment into a
//! [`ColumnReference`], or `None` when the fragment carries no column worth
//! reporting (literals, unaliased subqueries and arithmetic).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::ColumnReference;
use crate::ident::{unwrap_part, QualifiedIdent};
use crate::patterns::{DOT, PART_BARE, PART_BRACKET, PART_QUOTED};
use crate::splitter::{keyword_at, TopLevel};

/// Words that can trail an expression without being an alias.
const NOT_ALIASES: &[&str] = &[
    "AND", "AS", "ASC", "BETWEEN", "CASE", "COLLATE", "DESC", "ELSE", "END", "FROM", "IN", "IS", "LIKE",
    "NOT", "NULL", "OR", "OVER", "THEN", "WHEN",
];

fn any_part() -> String {
    format!("(?:{}|{}|{})", PART_BRACKET, PART_QUOTED, PART_BARE)
}

static ALIAS_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\[(?:[^\]]|\]\])+\]|"(?:[^"]|"")+"|'(?:[^']|'')+'|[\w@#$]+)$"#)
        .expect("alias regex is valid")
});

static IMPLICIT_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)^(?P<expr>.*\S)\s+(?P<alias>\[(?:[^\]]|\]\])+\]|"(?:[^"]|"")+"|[A-Za-z_][\w@#$]*)$"#)
        .expect("implicit alias regex is valid")
});

static LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?:[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:e[+-]?\d+)?|N?'(?:[^']|'')*'|NULL|0x[0-9a-f]*)$")
        .expect("literal regex is valid")
});

static SUBQUERY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSELECT\b").expect("subquery regex is valid"));

static CASE_EXPR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:CASE|WHEN)\b").expect("case regex is valid"));

/// A dot-qualified chain (`o.Price`, `[db].[t].[c]`). Bare parts must start
/// with a letter, so `1.5` is not a chain.
static QUALIFIED_CHAIN: Lazy<Regex> = Lazy::new(|| {
    let part = any_part();
    Regex::new(&format!("{part}(?:{DOT}{part})+")).expect("chain regex is valid")
});

static FUNCTION_CALL: Lazy<Regex> = Lazy::new(|| {
    let part = any_part();
    Regex::new(&format!(r"^(?P<name>{part}(?:{DOT}{part})*)\s*\(")).expect("function regex is valid")
});

/// Split an `AS alias` suffix (or an implicit trailing alias) off `expression`.
pub fn split_alias(expression: &str) -> (&str, Option<String>) {
    let expression = expression.trim();

    let explicit = TopLevel::new(expression)
        .filter(|&(_, c)| c == 'A' || c == 'a')
        .filter_map(|(i, _)| keyword_at(expression, i, "AS").map(|end| (i, end)))
        .last();
    if let Some((start, end)) = explicit {
        let alias = expression[end..].trim();
        let body = expression[..start].trim();
        if !body.is_empty() && ALIAS_TOKEN.is_match(alias) {
            return (body, Some(unwrap_alias(alias)));
        }
    }

    if let Some(caps) = IMPLICIT_ALIAS.captures(expression) {
        let body = caps.name("expr").map_or("", |m| m.as_str());
        let alias = caps.name("alias").map_or("", |m| m.as_str());
        let is_keyword = NOT_ALIASES.iter().any(|kw| kw.eq_ignore_ascii_case(alias));
        if !is_keyword && ends_like_column(body) {
            return (body, Some(unwrap_part(alias)));
        }
    }

    (expression, None)
}

/// True when `body` ends with `)`/`]` or its last token is dot-qualified.
fn ends_like_column(body: &str) -> bool {
    if body.ends_with(')') || body.ends_with(']') {
        return true;
    }
    body.split_whitespace()
        .next_back()
        .is_some_and(|token| token.contains('.') && QUALIFIED_CHAIN.is_match(token))
}

fn unwrap_alias(alias: &str) -> String {
    match alias.strip_prefix('\'').and_then(|a| a.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => unwrap_part(alias),
    }
}

/// Remove parentheses that wrap the whole expression, e.g. `((u.Name))`.
pub(crate) fn strip_outer_parens(mut body: &str) -> &str {
    while body.starts_with('(') && body.ends_with(')') {
        let wraps_all = TopLevel::new(body).all(|(i, _)| i == 0);
        if !wraps_all {
            break;
        }
        body = body[1..body.len() - 1].trim();
    }
    body
}

fn has_top_level_arithmetic(body: &str) -> bool {
    TopLevel::new(body).any(|(_, c)| matches!(c, '+' | '-' | '*' | '/'))
}

/// Named after its alias: the only thing worth reporting for computed columns.
fn aliased_only(alias: Option<String>) -> Option<ColumnReference> {
    alias.map(|a| ColumnReference::new(None, None, a.clone(), Some(a)))
}

fn from_ident(ident: &QualifiedIdent, alias: Option<String>) -> ColumnReference {
    let (database, table, column) = ident.column_parts();
    ColumnReference::new(database, table, column, alias)
}

/// Resolve one SELECT-list fragment.
///
/// ```
/// use qail_lens::resolver::resolve_column;
///
/// let col = resolve_column("[u].[Email] AS EmailAddress").unwrap();
/// assert_eq!(col.table_name.as_deref(), Some("u"));
/// assert_eq!(col.column.name, "Email");
/// assert_eq!(col.column.alias.as_deref(), Some("EmailAddress"));
///
/// assert!(resolve_column("'literal'").is_none());
/// ```
pub fn resolve_column(expression: &str) -> Option<ColumnReference> {
    let (body, alias) = split_alias(expression);
    let body = strip_outer_parens(body);
    if body.is_empty() {
        return None;
    }

    if LITERAL.is_match(body) {
        return None;
    }
    if SUBQUERY.is_match(body) || CASE_EXPR.is_match(body) {
        return aliased_only(alias);
    }
    // Pure names, including `*` and `t.*`.
    if let Some(ident) = QualifiedIdent::parse(body) {
        return Some(from_ident(&ident, alias));
    }

    if has_top_level_arithmetic(body) {
        let alias = alias?;
        return match QUALIFIED_CHAIN.find_iter(body).last() {
            Some(chain) => QualifiedIdent::parse(chain.as_str()).map(|ident| from_ident(&ident, Some(alias))),
            None => aliased_only(Some(alias)),
        };
    }

    if let Some(caps) = FUNCTION_CALL.captures(body) {
        let name = caps.name("name").and_then(|m| QualifiedIdent::parse(m.as_str()))?;
        return Some(ColumnReference::new(None, None, name.last(), alias));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(expr: &str) -> (Option<String>, Option<String>, String, Option<String>) {
        let c = resolve_column(expr).unwrap_or_else(|| panic!("{expr} should resolve"));
        (c.database_name, c.table_name, c.column.name, c.column.alias)
    }

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_plain_and_qualified_columns() {
        assert_eq!(resolved("Name"), (None, None, "Name".into(), None));
        assert_eq!(resolved("u.Name"), (None, s("u"), "Name".into(), None));
        assert_eq!(resolved("[Db].[dbo].[Users].[Id]"), (s("Db"), s("Users"), "Id".into(), None));
    }

    #[test]
    fn test_explicit_alias_wins() {
        assert_eq!(resolved("u.Email AS EmailAddress"), (None, s("u"), "Email".into(), s("EmailAddress")));
        assert_eq!(resolved("u.Email as [E Mail]"), (None, s("u"), "Email".into(), s("E Mail")));
        assert_eq!(resolved("Total AS 'Grand Total'"), (None, None, "Total".into(), s("Grand Total")));
    }

    #[test]
    fn test_implicit_alias() {
        assert_eq!(resolved("u.Name UserName"), (None, s("u"), "Name".into(), s("UserName")));
        assert_eq!(resolved("COUNT(*) Total"), (None, None, "COUNT".into(), s("Total")));
        assert_eq!(resolved("[Name] N"), (None, None, "Name".into(), s("N")));
        assert!(resolve_column("Name Foo").is_none());
    }

    #[test]
    fn test_keyword_never_alias() {
        let (body, alias) = split_alias("CASE WHEN u.a = 1 THEN u.b ELSE u.c END");
        assert_eq!(alias, None);
        assert!(body.ends_with("END"));
    }

    #[test]
    fn test_cast_inside_function_is_not_alias() {
        let (body, alias) = split_alias("CAST(u.Age AS INT)");
        assert_eq!(body, "CAST(u.Age AS INT)");
        assert_eq!(alias, None);
        assert_eq!(resolved("CAST(u.Age AS INT) AS AgeInt"), (None, None, "CAST".into(), s("AgeInt")));
    }

    #[test]
    fn test_literals_discarded() {
        for lit in ["1", "-2.5", "'abc'", "N'x'", "NULL", "0x1F"] {
            assert!(resolve_column(lit).is_none(), "{lit}");
        }
        assert!(resolve_column("'abc' AS Label").is_none());
    }

    #[test]
    fn test_double_quoted_is_identifier() {
        assert_eq!(resolved("\"Order Date\""), (None, None, "Order Date".into(), None));
    }

    #[test]
    fn test_subquery_requires_alias() {
        assert!(resolve_column("(SELECT MAX(x) FROM y)").is_none());
        assert_eq!(resolved("(SELECT MAX(x) FROM y) AS MaxX"), (None, None, "MaxX".into(), s("MaxX")));
    }

    #[test]
    fn test_complex_requires_alias() {
        assert!(resolve_column("Price * Quantity").is_none());
        assert_eq!(resolved("Price * Quantity AS Total"), (None, None, "Total".into(), s("Total")));
        assert!(resolve_column("CASE WHEN a = 1 THEN 'y' END").is_none());
        assert_eq!(
            resolved("CASE WHEN a = 1 THEN 'y' END AS Flag"),
            (None, None, "Flag".into(), s("Flag"))
        );
    }

    #[test]
    fn test_qualified_arithmetic_reports_last_column() {
        assert_eq!(
            resolved("(o.Price * o.Quantity) - o.Discount AS Foo"),
            (None, s("o"), "Discount".into(), s("Foo"))
        );
        assert_eq!(
            resolved("o.Price * o.Quantity AS LineTotal"),
            (None, s("o"), "Quantity".into(), s("LineTotal"))
        );
        assert!(resolve_column("o.Price * o.Quantity").is_none());
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(resolved("COUNT(*) AS Total"), (None, None, "COUNT".into(), s("Total")));
        assert_eq!(resolved("ISNULL(u.Nick, u.Name)"), (None, None, "ISNULL".into(), None));
        assert_eq!(resolved("dbo.FullName(u.Id) AS Name"), (None, None, "FullName".into(), s("Name")));
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(resolved("*"), (None, None, "*".into(), None));
        assert_eq!(resolved("u.*"), (None, s("u"), "*".into(), None));
    }

    #[test]
    fn test_redundant_parens() {
        assert_eq!(resolved("((u.Name))"), (None, s("u"), "Name".into(), None));
    }
}
