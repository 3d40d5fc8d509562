//! Qualified identifier tokenizer.
//!
//! One nom grammar covers every shape of T-SQL multi-part name:
//!
//! ```text
//! [Srv].[Db].[dbo].[Users]     bracket parts, ]] escapes ]
//! "Db"."dbo"."Users"           quoted parts, "" escapes "
//! Db..Users                    empty (default) schema
//! u . Name                     whitespace around dots
//! ```
//!
//! The part count is a parameter of the result rather than of the grammar,
//! so a 4-part name can never be read as a 3-part one.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt},
    multi::{fold_many0, separated_list1},
    sequence::delimited,
    IResult,
};

use crate::splitter::is_word_char;

/// Maximum number of parts in a qualified name (`server.database.schema.table.column`).
pub const MAX_PARTS: usize = 5;

/// A dot-separated name with its delimiters removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedIdent {
    parts: Vec<String>,
}

impl QualifiedIdent {
    /// Build from already-unwrapped parts. Rejects empty lists, more than
    /// [`MAX_PARTS`] parts, and names whose first or last part is empty.
    pub fn new(parts: Vec<String>) -> Option<Self> {
        if parts.is_empty() || parts.len() > MAX_PARTS {
            return None;
        }
        if parts.first().is_some_and(String::is_empty) || parts.last().is_some_and(String::is_empty) {
            return None;
        }
        Some(Self { parts })
    }

    /// Tokenize a complete qualified name. Trailing or leading garbage fails.
    pub fn parse(input: &str) -> Option<Self> {
        match all_consuming(qualified_parts)(input.trim()) {
            Ok((_, parts)) => Self::new(parts),
            Err(_) => None,
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The last part: the object (or column) being named.
    pub fn last(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Positional (database, table, column) mapping for a column reference.
    ///
    /// The mapping never looks at a schema: three parts are always read as
    /// `database.table.column`, four as `database.schema.table.column` and
    /// five as `server.database.schema.table.column`, where the server is
    /// reported as the database.
    pub fn column_parts(&self) -> (Option<&str>, Option<&str>, &str) {
        match self.parts.len() {
            1 => (None, None, &self.parts[0]),
            2 => (None, self.part_at(0), &self.parts[1]),
            3 => (self.part_at(0), self.part_at(1), &self.parts[2]),
            4 => (self.part_at(0), self.part_at(2), &self.parts[3]),
            _ => (self.part_at(0), self.part_at(3), &self.parts[4]),
        }
    }

    fn part_at(&self, index: usize) -> Option<&str> {
        self.parts.get(index).and_then(|p| non_empty(p))
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

/// Strip one layer of `[..]` or `".."` from a single token, unescaping
/// doubled delimiters. Bare tokens are returned unchanged.
pub fn unwrap_part(token: &str) -> String {
    let token = token.trim();
    match all_consuming(part)(token) {
        Ok((_, unwrapped)) => unwrapped,
        Err(_) => token.to_string(),
    }
}

/// `[name]` with `]]` as an escaped `]`.
fn bracketed(input: &str) -> IResult<&str, String> {
    delimited(
        char('['),
        fold_many0(
            alt((tag("]]"), is_not("]"))),
            String::new,
            |mut acc, chunk: &str| {
                if chunk == "]]" {
                    acc.push(']');
                } else {
                    acc.push_str(chunk);
                }
                acc
            },
        ),
        char(']'),
    )(input)
}

/// `"name"` with `""` as an escaped `"`.
fn quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((tag("\"\""), is_not("\""))),
            String::new,
            |mut acc, chunk: &str| {
                if chunk == "\"\"" {
                    acc.push('"');
                } else {
                    acc.push_str(chunk);
                }
                acc
            },
        ),
        char('"'),
    )(input)
}

fn bare(input: &str) -> IResult<&str, String> {
    map(
        alt((take_while1(is_word_char), tag("*"))),
        str::to_string,
    )(input)
}

fn part(input: &str) -> IResult<&str, String> {
    alt((bracketed, quoted, bare))(input)
}

fn dot(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char('.'), multispace0)(input)
}

/// Parts separated by dots; a missing part (`a..b`) becomes an empty string.
fn qualified_parts(input: &str) -> IResult<&str, Vec<String>> {
    separated_list1(dot, map(opt(part), Option::unwrap_or_default))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(input: &str) -> Vec<String> {
        QualifiedIdent::parse(input).unwrap().parts().to_vec()
    }

    #[test]
    fn test_bracketed_parts() {
        assert_eq!(parts("[MyDB].[dbo].[Users]"), vec!["MyDB", "dbo", "Users"]);
    }

    #[test]
    fn test_escaped_delimiters() {
        assert_eq!(parts("[a]]b].[c]"), vec!["a]b", "c"]);
        assert_eq!(parts("\"say \"\"hi\"\"\""), vec!["say \"hi\""]);
    }

    #[test]
    fn test_mixed_shapes_and_spacing() {
        assert_eq!(parts("[Db] . \"dbo\".Users"), vec!["Db", "dbo", "Users"]);
    }

    #[test]
    fn test_empty_schema() {
        assert_eq!(parts("Db..Users"), vec!["Db", "", "Users"]);
        let id = QualifiedIdent::parse("Db..dbo2.c").unwrap();
        assert_eq!(id.column_parts(), (Some("Db"), Some("dbo2"), "c"));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(QualifiedIdent::parse("a.b.c.d.e.f").is_none());
        assert!(QualifiedIdent::parse("a.").is_none());
        assert!(QualifiedIdent::parse(".a").is_none());
        assert!(QualifiedIdent::parse("a b").is_none());
        assert!(QualifiedIdent::parse("COUNT(*)").is_none());
        assert!(QualifiedIdent::parse("").is_none());
    }

    #[test]
    fn test_column_part_mapping() {
        let map = |s: &str| {
            let id = QualifiedIdent::parse(s).unwrap();
            let (d, t, c) = id.column_parts();
            (d.map(String::from), t.map(String::from), c.to_string())
        };
        assert_eq!(map("Name"), (None, None, "Name".into()));
        assert_eq!(map("u.Name"), (None, Some("u".into()), "Name".into()));
        assert_eq!(map("db.t.c"), (Some("db".into()), Some("t".into()), "c".into()));
        assert_eq!(map("db.s.t.c"), (Some("db".into()), Some("t".into()), "c".into()));
        assert_eq!(map("srv.db.s.t.c"), (Some("srv".into()), Some("t".into()), "c".into()));
    }

    #[test]
    fn test_wildcard_part() {
        assert_eq!(parts("u.*"), vec!["u", "*"]);
    }

    #[test]
    fn test_unwrap_part() {
        assert_eq!(unwrap_part("[Total Sales]"), "Total Sales");
        assert_eq!(unwrap_part("\"Alias\""), "Alias");
        assert_eq!(unwrap_part("Plain"), "Plain");
        assert_eq!(unwrap_part("'lit'"), "'lit'");
    }
}
