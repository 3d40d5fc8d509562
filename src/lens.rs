//! The engine handle.

use crate::ast::{ColumnReference, QueryAnalysis, WhereCondition};
use crate::config::LensConfig;
use crate::patterns::MatchBudget;
use crate::{extract, rewrite};

/// Extraction and rewriting with a fixed match budget.
///
/// `Lens` is `Copy` and holds no compiled state; the pattern tables are
/// shared process-wide.
///
/// ```
/// use qail_lens::Lens;
///
/// let lens = Lens::default();
/// let sql = "SELECT * FROM [MyDB].[dbo].[Users] WHERE Active = 1";
/// assert_eq!(lens.extract_database_names(sql), vec!["MyDB"]);
/// assert_eq!(lens.extract_first_table_name(sql).as_deref(), Some("Users"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lens {
    budget: MatchBudget,
}

impl Lens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: MatchBudget) -> Self {
        Self { budget }
    }

    pub fn from_config(config: &LensConfig) -> Self {
        Self::with_budget(config.budget())
    }

    pub fn budget(&self) -> MatchBudget {
        self.budget
    }

    pub fn extract_database_names(&self, sql: &str) -> Vec<String> {
        extract::database_names(sql, self.budget)
    }

    pub fn extract_first_table_name(&self, sql: &str) -> Option<String> {
        extract::first_table_name(sql, self.budget)
    }

    pub fn extract_column_details(&self, sql: &str) -> Vec<ColumnReference> {
        extract::column_details(sql)
    }

    pub fn extract_where_conditions(&self, sql: &str) -> Vec<WhereCondition> {
        extract::where_conditions(sql)
    }

    pub fn extract_order_by_clause(&self, sql: &str) -> Option<String> {
        extract::order_by(sql)
    }

    pub fn analyze(&self, sql: &str) -> Option<QueryAnalysis> {
        extract::analyze(sql, self.budget)
    }

    pub fn to_count(&self, sql: &str) -> Option<String> {
        rewrite::to_count(sql)
    }

    pub fn to_top(&self, sql: &str, n: i64) -> Option<String> {
        rewrite::to_top(sql, n)
    }

    pub fn to_distinct(&self, sql: &str) -> Option<String> {
        rewrite::to_distinct(sql)
    }

    pub fn to_order_by(&self, sql: &str, clause: &str) -> Option<String> {
        rewrite::to_order_by(sql, clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_from_config() {
        let lens = Lens::from_config(&LensConfig { match_budget_ms: 20 });
        assert_eq!(lens.budget().limit(), Duration::from_millis(20));
        assert_eq!(Lens::new().budget(), MatchBudget::default());
    }

    #[test]
    fn test_zero_budget_finds_no_names() {
        let lens = Lens::with_budget(MatchBudget::new(Duration::ZERO));
        let sql = "SELECT u.Id FROM [MyDB].[dbo].[Users] u";
        assert!(lens.extract_database_names(sql).is_empty());
        assert_eq!(lens.extract_first_table_name(sql), None);
        // Clause-based operations do not use the pattern tables.
        assert_eq!(lens.extract_column_details(sql).len(), 1);
        assert_eq!(lens.to_count(sql).as_deref(), Some("SELECT COUNT(*) FROM [MyDB].[dbo].[Users] u"));
    }
}
