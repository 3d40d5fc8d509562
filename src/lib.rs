//! # QAIL Lens — T-SQL fragment extraction and rewriting
//!
//! > **Read a query without running it.**
//!
//! QAIL Lens pulls structure out of T-SQL text (database names, tables,
//! projected columns, WHERE predicates) and rewrites SELECT statements into
//! COUNT, TOP, DISTINCT and re-ordered variants. It works on text alone: no
//! connection, no catalog, no full grammar.
//!
//! ## Quick Example
//!
//! ```rust
//! use qail_lens::prelude::*;
//!
//! let sql = "SELECT u.Name, u.Email AS EmailAddress FROM [MyDB].[dbo].[Users] u WHERE u.Active = 1";
//!
//! assert_eq!(extract_database_names(sql), vec!["MyDB"]);
//! assert_eq!(extract_first_table_name(sql).as_deref(), Some("Users"));
//!
//! let cols = extract_column_details(sql);
//! assert_eq!(cols[1].column.alias.as_deref(), Some("EmailAddress"));
//!
//! assert_eq!(
//!     to_count(sql).as_deref(),
//!     Some("SELECT COUNT(*) FROM [MyDB].[dbo].[Users] u WHERE u.Active = 1")
//! );
//! ```
//!
//! ## Pipeline
//!
//! | Stage        | Module         | Job                                          |
//! |--------------|----------------|----------------------------------------------|
//! | Normalize    | [`preprocess`] | Drop comments, `USE`/`GO`, CTE prologue      |
//! | Locate       | [`patterns`]   | Ranked templates find object names           |
//! | Tokenize     | [`ident`]      | Split `[a].[b].c` into parts                 |
//! | Split        | [`splitter`]   | Depth-aware comma / AND / OR splitting       |
//! | Resolve      | [`resolver`]   | Classify SELECT items                        |
//! | Clauses      | [`clauses`]    | SELECT / WHERE / ORDER BY boundaries         |
//! | Rewrite      | [`rewrite`]    | COUNT / TOP / DISTINCT / ORDER BY variants   |
//!
//! Inputs an operation does not apply to come back as `None` or an empty
//! `Vec`, never as an error.

pub mod ast;
pub mod clauses;
pub mod config;
pub mod error;
pub mod extract;
pub mod ident;
pub mod lens;
pub mod patterns;
pub mod preprocess;
pub mod resolver;
pub mod rewrite;
pub mod splitter;

pub use lens::Lens;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::LensConfig;
    pub use crate::error::*;
    pub use crate::lens::Lens;
    pub use crate::patterns::MatchBudget;
    pub use crate::{
        analyze, extract_column_details, extract_database_names, extract_first_table_name,
        extract_order_by_clause, extract_where_conditions, to_count, to_distinct, to_order_by, to_top,
    };
}

use ast::{ColumnReference, QueryAnalysis, WhereCondition};

/// Database names referenced in `sql`, in text order, case-insensitively unique.
///
/// # Example
///
/// ```
/// use qail_lens::extract_database_names;
///
/// let sql = "SELECT * FROM [MyDB].[dbo].[Users] u JOIN [Other].[dbo].[Orders] o ON o.UserId = u.Id";
/// assert_eq!(extract_database_names(sql), vec!["MyDB", "Other"]);
/// ```
pub fn extract_database_names(sql: &str) -> Vec<String> {
    Lens::default().extract_database_names(sql)
}

/// The first table named after `FROM` or `JOIN`, without qualifiers.
pub fn extract_first_table_name(sql: &str) -> Option<String> {
    Lens::default().extract_first_table_name(sql)
}

/// Resolved SELECT-list columns.
pub fn extract_column_details(sql: &str) -> Vec<ColumnReference> {
    Lens::default().extract_column_details(sql)
}

/// Simple predicates of the WHERE clause.
///
/// # Example
///
/// ```
/// use qail_lens::{extract_where_conditions, ast::WhereOperator};
///
/// let conds = extract_where_conditions("SELECT * FROM Users WHERE DeletedDate IS NULL");
/// assert_eq!(conds[0].column.name, "DeletedDate");
/// assert_eq!(conds[0].operator, WhereOperator::Is);
/// assert_eq!(conds[0].value, "NULL");
/// ```
pub fn extract_where_conditions(sql: &str) -> Vec<WhereCondition> {
    Lens::default().extract_where_conditions(sql)
}

/// The ORDER BY list, without the keyword or pagination.
pub fn extract_order_by_clause(sql: &str) -> Option<String> {
    Lens::default().extract_order_by_clause(sql)
}

/// All extraction results for one SELECT.
pub fn analyze(sql: &str) -> Option<QueryAnalysis> {
    Lens::default().analyze(sql)
}

/// See [`rewrite::to_count`].
pub fn to_count(sql: &str) -> Option<String> {
    rewrite::to_count(sql)
}

/// See [`rewrite::to_top`].
pub fn to_top(sql: &str, n: i64) -> Option<String> {
    rewrite::to_top(sql, n)
}

/// See [`rewrite::to_distinct`].
pub fn to_distinct(sql: &str) -> Option<String> {
    rewrite::to_distinct(sql)
}

/// See [`rewrite::to_order_by`].
pub fn to_order_by(sql: &str, clause: &str) -> Option<String> {
    rewrite::to_order_by(sql, clause)
}
