//! Clause boundary detection for single SELECT statements.
//!
//! Boundaries are byte offsets into *normalized* text (see
//! [`crate::preprocess::normalize`]). Keywords only count at parenthesis
//! depth 0 and outside quotes, so subqueries never move a boundary.
//!
//! ```text
//! SELECT DISTINCT TOP 5 a, b FROM t WHERE x = 1 ORDER BY a OFFSET 0 ROWS OPTION (RECOMPILE);
//!                       ^^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^ ^^^^^^^^^^^^^^^^^^^^^
//!                  select_list  from ..                  order_by    pagination  trailer   end
//! ```

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::preprocess::normalize;
use crate::splitter::{find_any_keyword, find_keyword, keyword_at, TopLevel};

/// Keywords that end a SELECT list when there is no FROM.
const SELECT_LIST_TERMINATORS: &[&str] = &[
    "FROM", "WHERE", "GROUP BY", "HAVING", "ORDER BY", "UNION", "EXCEPT", "INTERSECT", "OPTION",
];

/// Keywords that end a WHERE predicate.
const WHERE_TERMINATORS: &[&str] = &[
    "GROUP BY", "HAVING", "ORDER BY", "UNION", "EXCEPT", "INTERSECT", "OPTION",
];

const SET_OPERATORS: &[&str] = &["UNION", "EXCEPT", "INTERSECT"];

static MODIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?P<word>DISTINCT|ALL)\b|(?P<top>(?:TOP\s*\(\s*[^)]*\)|TOP\s+\d+\b)(?:\s+PERCENT\b)?(?:\s+WITH\s+TIES\b)?))",
    )
    .expect("modifier regex is valid")
});

/// Leading SELECT-list modifiers, recorded before they are stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectModifiers {
    pub distinct: bool,
    pub all: bool,
    /// The full `TOP ...` text as written, e.g. `TOP (10) PERCENT`.
    pub top: Option<String>,
}

/// Offsets of the clauses of one SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseBoundaries {
    /// SELECT list with modifiers stripped.
    pub select_list: Range<usize>,
    /// Start of the top-level `FROM` keyword.
    pub from: Option<usize>,
    /// WHERE predicate (keyword excluded).
    pub where_predicate: Option<Range<usize>>,
    /// Start of the `ORDER BY` keyword.
    pub order_by: Option<usize>,
    /// ORDER BY list (keywords excluded).
    pub order_list: Option<Range<usize>>,
    /// `OFFSET ... [FETCH ...]` suffix.
    pub pagination: Option<Range<usize>>,
    /// `OPTION (...)` query hints after everything else.
    pub trailer: Option<Range<usize>>,
    /// End of the statement body; `text[end..]` is the `;` and anything after it.
    pub end: usize,
    pub modifiers: SelectModifiers,
}

impl ClauseBoundaries {
    /// Locate the clauses of normalized `text`. `None` unless it starts with `SELECT`.
    pub fn locate(text: &str) -> Option<Self> {
        let end = statement_end(text);
        let mut pos = keyword_at(text, 0, "SELECT")?;

        let mut modifiers = SelectModifiers::default();
        while let Some(caps) = MODIFIER.captures(&text[pos..end]) {
            if let Some(word) = caps.name("word") {
                if word.as_str().eq_ignore_ascii_case("DISTINCT") {
                    modifiers.distinct = true;
                } else {
                    modifiers.all = true;
                }
            } else if let Some(top) = caps.name("top") {
                modifiers.top = Some(top.as_str().to_string());
            }
            pos += caps[0].len();
        }

        let within = |r: Range<usize>| (r.start < end).then_some(r);

        let from = find_keyword(text, pos, "FROM").and_then(within);
        let list_end = match &from {
            Some(r) => r.start,
            None => find_any_keyword(text, pos, SELECT_LIST_TERMINATORS)
                .and_then(within)
                .map_or(end, |r| r.start),
        };
        let select_list = trim_span(text, pos..list_end);

        let body_start = from.as_ref().map_or(list_end, |r| r.end);
        let set_op = find_any_keyword(text, body_start, SET_OPERATORS)
            .and_then(within)
            .map_or(end, |r| r.start);

        let where_predicate = find_keyword(text, body_start, "WHERE")
            .filter(|r| r.start < set_op)
            .map(|kw| {
                let stop = find_any_keyword(text, kw.end, WHERE_TERMINATORS)
                    .and_then(within)
                    .map_or(end, |r| r.start);
                trim_span(text, kw.end..stop)
            })
            .filter(|r| !r.is_empty());

        let trailer_start = find_keyword(text, body_start, "OPTION")
            .and_then(within)
            .map(|r| r.start);
        let tail_end = trailer_start.unwrap_or(end);

        let order_kw = find_keyword(text, body_start, "ORDER BY").filter(|r| r.start < tail_end);
        // OFFSET ... FETCH only paginates after an ORDER BY.
        let pagination = order_kw
            .as_ref()
            .and_then(|kw| find_keyword(text, kw.end, "OFFSET"))
            .filter(|r| r.start < tail_end)
            .map(|r| trim_span(text, r.start..tail_end));

        let order_list = order_kw.as_ref().map(|kw| {
            let stop = pagination.as_ref().map_or(tail_end, |p| p.start);
            trim_span(text, kw.end..stop)
        });

        Some(Self {
            select_list,
            from: from.map(|r| r.start),
            where_predicate,
            order_by: order_kw.map(|r| r.start),
            order_list,
            pagination,
            trailer: trailer_start.map(|start| trim_span(text, start..end)),
            end,
            modifiers,
        })
    }

    /// Where the ordering suffix (ORDER BY, pagination, hints) begins.
    pub fn suffix_start(&self) -> usize {
        [
            self.order_by,
            self.pagination.as_ref().map(|r| r.start),
            self.trailer.as_ref().map(|r| r.start),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(self.end)
    }
}

/// Byte offset of the end of the first statement, excluding a top-level
/// `;` and trailing whitespace.
fn statement_end(text: &str) -> usize {
    let stop = TopLevel::new(text)
        .find(|&(_, c)| c == ';')
        .map_or(text.len(), |(i, _)| i);
    text[..stop].trim_end().len()
}

fn trim_span(text: &str, span: Range<usize>) -> Range<usize> {
    let slice = &text[span.clone()];
    let start = span.start + (slice.len() - slice.trim_start().len());
    let end = span.start + slice.trim_end().len();
    start..end.max(start)
}

fn slice(text: &str, span: Option<&Range<usize>>) -> Option<String> {
    span.map(|r| text[r.clone()].to_string())
        .filter(|s| !s.is_empty())
}

/// SELECT list of `sql`, without DISTINCT/ALL/TOP modifiers.
pub fn select_clause(sql: &str) -> Option<String> {
    let text = normalize(sql);
    let bounds = ClauseBoundaries::locate(&text)?;
    slice(&text, Some(&bounds.select_list))
}

/// WHERE predicate of `sql`.
pub fn where_clause(sql: &str) -> Option<String> {
    let text = normalize(sql);
    let bounds = ClauseBoundaries::locate(&text)?;
    slice(&text, bounds.where_predicate.as_ref())
}

/// ORDER BY list of `sql`, without the keyword and without pagination.
pub fn order_by_clause(sql: &str) -> Option<String> {
    let text = normalize(sql);
    let bounds = ClauseBoundaries::locate(&text)?;
    slice(&text, bounds.order_list.as_ref())
}

/// `OFFSET ... FETCH ...` suffix of `sql`.
pub fn pagination_clause(sql: &str) -> Option<String> {
    let text = normalize(sql);
    let bounds = ClauseBoundaries::locate(&text)?;
    slice(&text, bounds.pagination.as_ref())
}
