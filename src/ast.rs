//! Value types produced by extraction.

use std::fmt;

use serde::Serialize;

use crate::clauses::SelectModifiers;

/// A column name and the alias it is projected under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub alias: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
        }
    }
}

/// One projected column, with whatever qualifiers preceded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnReference {
    pub database_name: Option<String>,
    pub table_name: Option<String>,
    pub column: ColumnInfo,
}

impl ColumnReference {
    pub fn new(
        database_name: Option<&str>,
        table_name: Option<&str>,
        name: impl Into<String>,
        alias: Option<String>,
    ) -> Self {
        Self {
            database_name: database_name.map(str::to_string),
            table_name: table_name.map(str::to_string),
            column: ColumnInfo::new(name, alias),
        }
    }
}

/// Comparison operators recognized in WHERE predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WhereOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "IS")]
    Is,
    #[serde(rename = "IS NOT")]
    IsNot,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "NOT LIKE")]
    NotLike,
}

impl WhereOperator {
    /// Parse an operator as written in SQL. Word operators are
    /// case-insensitive and may have any whitespace between words.
    pub fn from_sql(op: &str) -> Option<Self> {
        let upper: Vec<String> = op.split_whitespace().map(str::to_ascii_uppercase).collect();
        let words: Vec<&str> = upper.iter().map(String::as_str).collect();
        let op = match words.as_slice() {
            ["="] => Self::Eq,
            ["!="] => Self::NotEq,
            ["<>"] => Self::Ne,
            [">"] => Self::Gt,
            ["<"] => Self::Lt,
            [">="] => Self::Gte,
            ["<="] => Self::Lte,
            ["LIKE"] => Self::Like,
            ["IN"] => Self::In,
            ["IS"] => Self::Is,
            ["IS", "NOT"] => Self::IsNot,
            ["NOT", "IN"] => Self::NotIn,
            ["NOT", "LIKE"] => Self::NotLike,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::NotIn => "NOT IN",
            Self::NotLike => "NOT LIKE",
        }
    }
}

impl fmt::Display for WhereOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `column <op> value` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhereCondition {
    pub column: ColumnInfo,
    pub operator: WhereOperator,
    /// Right-hand side exactly as written.
    pub value: String,
}

/// Everything the extractors can tell about one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnalysis {
    pub databases: Vec<String>,
    pub table: Option<String>,
    pub columns: Vec<ColumnReference>,
    pub conditions: Vec<WhereCondition>,
    pub order_by: Option<String>,
    pub pagination: Option<String>,
    pub modifiers: SelectModifiers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trip_spelling() {
        assert_eq!(WhereOperator::from_sql("is   not"), Some(WhereOperator::IsNot));
        assert_eq!(WhereOperator::from_sql("Not Like"), Some(WhereOperator::NotLike));
        assert_eq!(WhereOperator::from_sql("=="), None);
        assert_eq!(WhereOperator::NotIn.to_string(), "NOT IN");
    }

    #[test]
    fn test_column_reference_json_shape() {
        let col = ColumnReference::new(None, Some("u"), "Email", Some("EmailAddress".into()));
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "databaseName": null,
                "tableName": "u",
                "column": { "name": "Email", "alias": "EmailAddress" }
            })
        );
    }

    #[test]
    fn test_operator_serializes_as_sql() {
        let json = serde_json::to_string(&WhereOperator::IsNot).unwrap();
        assert_eq!(json, "\"IS NOT\"");
    }
}
