//! Pattern library for qualified object names.
//!
//! Templates locate `FROM`/`JOIN`-style object references; the captured
//! text is then handed to [`QualifiedIdent::parse`] for splitting. All
//! templates come from one part rule parameterized on part count and
//! delimiter shape, and are tried most-specific-first:
//!
//! ```text
//! rank 4: [a].[b].[c].[d]   "a"."b"."c"."d"   a.b.c.d   mixed
//! rank 3: ...
//! rank 2: ...
//! rank 1: ...
//! ```
//!
//! A span claimed by a longer template is never re-claimed by a shorter
//! one, and a keyword that is itself the tail of a dotted name
//! (`t.Join AS j`) introduces nothing. The tables are compiled once per
//! process and only read afterwards.

use std::ops::Range;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::ident::QualifiedIdent;

pub(crate) const PART_BRACKET: &str = r"\[(?:[^\]]|\]\])+\]";
pub(crate) const PART_QUOTED: &str = r#""(?:[^"]|"")+""#;
pub(crate) const PART_BARE: &str = r"[A-Za-z_@#][\w@#$]*";
pub(crate) const DOT: &str = r"\s*\.\s*";

/// Keywords that introduce a table reference.
const TABLE_KEYWORDS: &[&str] = &["FROM", "JOIN"];

/// Keywords after which a database-qualified object may appear.
const DATABASE_KEYWORDS: &[&str] = &["FROM", "JOIN", "INTO", "UPDATE", "TABLE", "MERGE", "USING"];

/// How far back the chain-tail check looks.
const LOOKBACK_CHARS: usize = 50;

/// Compiled program size cap per template.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Delimiter shape of every part a template accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `[name]`
    Bracket,
    /// `"name"`
    Quoted,
    /// `name`
    Bare,
    /// Any mix of the three.
    Mixed,
}

impl Shape {
    const ORDER: [Shape; 4] = [Shape::Bracket, Shape::Quoted, Shape::Bare, Shape::Mixed];

    fn part(self) -> String {
        match self {
            Shape::Bracket => PART_BRACKET.to_string(),
            Shape::Quoted => PART_QUOTED.to_string(),
            Shape::Bare => PART_BARE.to_string(),
            Shape::Mixed => format!("(?:{}|{}|{})", PART_BRACKET, PART_QUOTED, PART_BARE),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Shape::Bracket => "bracket",
            Shape::Quoted => "quoted",
            Shape::Bare => "bare",
            Shape::Mixed => "mixed",
        }
    }
}

/// Wall-clock budget for evaluating one template against one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchBudget {
    limit: Duration,
}

impl MatchBudget {
    pub const DEFAULT_MILLIS: u64 = 1_000;

    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl Default for MatchBudget {
    fn default() -> Self {
        Self::from_millis(Self::DEFAULT_MILLIS)
    }
}

/// One ranked template.
#[derive(Debug)]
pub struct Pattern {
    id: String,
    rank: usize,
    shape: Shape,
    /// Index of the database part in the tokenized name, if this shape carries one.
    database_part: Option<usize>,
    /// Index of the table part in the tokenized name.
    table_part: usize,
    regex: Regex,
}

impl Pattern {
    fn build(family: &str, keywords: &[&str], rank: usize, shape: Shape) -> Option<Self> {
        let source = format!(r"\b(?:{})\s+({})", keywords.join("|"), name_source(shape, rank));
        let id = format!("{}/{}/{}", family, rank, shape.label());

        let regex = match RegexBuilder::new(&source)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(regex) => regex,
            Err(e) => {
                tracing::warn!(pattern = %id, error = %e, "pattern failed to compile; skipped");
                return None;
            }
        };

        let database_part = match rank {
            4 => Some(1),
            3 => Some(0),
            _ => None,
        };

        Some(Self {
            id,
            rank,
            shape,
            database_part,
            table_part: rank - 1,
            regex,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of dot-separated parts this template matches.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn database_part(&self) -> Option<usize> {
        self.database_part
    }

    pub fn table_part(&self) -> usize {
        self.table_part
    }

    /// Every object name this template captures in `text`, with the offset
    /// of the keyword that introduced it.
    ///
    /// If the budget runs out, the template counts as not matching at all.
    pub fn find_names(&self, text: &str, budget: MatchBudget) -> Vec<Candidate> {
        let started = Instant::now();
        let mut found = Vec::new();

        for caps in self.regex.captures_iter(text) {
            if started.elapsed() >= budget.limit() {
                self.over_budget(budget);
                return Vec::new();
            }
            if let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) {
                found.push(Candidate {
                    keyword: whole.start(),
                    name: name.range(),
                });
            }
        }

        if started.elapsed() >= budget.limit() {
            self.over_budget(budget);
            return Vec::new();
        }
        found
    }

    fn over_budget(&self, budget: MatchBudget) {
        tracing::warn!(
            pattern = %self.id,
            limit_ms = budget.limit().as_millis() as u64,
            "pattern exceeded its match budget; treating as no match"
        );
    }
}

/// A name captured by one template, before the cascade decides on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Start of the introducing keyword.
    pub keyword: usize,
    pub name: Range<usize>,
}

/// Regex source for an object name of `rank` parts. Interior parts may be
/// empty so `Db..Table` is a 3-part name.
fn name_source(shape: Shape, rank: usize) -> String {
    let part = shape.part();
    let mut source = format!("(?:{})", part);
    for n in 1..rank {
        if n + 1 < rank {
            source.push_str(&format!("{}(?:{})?", DOT, part));
        } else {
            source.push_str(&format!("{}(?:{})", DOT, part));
        }
    }
    source
}

fn build_family(family: &str, keywords: &[&str], ranks: &[usize]) -> Vec<Pattern> {
    ranks
        .iter()
        .flat_map(|&rank| Shape::ORDER.iter().map(move |&shape| (rank, shape)))
        .filter_map(|(rank, shape)| Pattern::build(family, keywords, rank, shape))
        .collect()
}

static DATABASE_PATTERNS: Lazy<Vec<Pattern>> =
    Lazy::new(|| build_family("database", DATABASE_KEYWORDS, &[4, 3]));

static TABLE_PATTERNS: Lazy<Vec<Pattern>> =
    Lazy::new(|| build_family("table", TABLE_KEYWORDS, &[4, 3, 2, 1]));

static CHAIN_TAIL: Lazy<Regex> = Lazy::new(|| {
    let part = Shape::Mixed.part();
    Regex::new(&format!(r"{}{}$", part, DOT)).expect("chain tail regex is valid")
});

/// Templates that carry a database part (4- and 3-part names), most specific first.
pub fn database_patterns() -> &'static [Pattern] {
    &DATABASE_PATTERNS
}

/// Templates for `FROM`/`JOIN` object names, 4-part down to 1-part.
pub fn table_name_patterns() -> &'static [Pattern] {
    &TABLE_PATTERNS
}

/// An object name claimed by one template.
#[derive(Debug, Clone)]
pub struct NameMatch {
    pub span: Range<usize>,
    pub ident: QualifiedIdent,
    pub pattern: &'static Pattern,
}

impl NameMatch {
    pub fn database(&self) -> Option<&str> {
        self.pattern
            .database_part()
            .and_then(|i| self.ident.parts().get(i))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn table(&self) -> &str {
        self.ident
            .parts()
            .get(self.pattern.table_part())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Whether the name is immediately followed by `(`: a table-valued
    /// function call rather than a table.
    pub fn is_function_call(&self, text: &str) -> bool {
        text[self.span.end..].trim_start().starts_with('(')
    }
}

/// True if the `LOOKBACK_CHARS` before `start` end in a dot-qualified token,
/// i.e. the word starting at `start` is the tail of a longer identifier.
pub fn is_chain_tail(text: &str, start: usize) -> bool {
    let window_start = text[..start]
        .char_indices()
        .rev()
        .take(LOOKBACK_CHARS)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    CHAIN_TAIL.is_match(&text[window_start..start])
}

fn continues_with_dot(text: &str, end: usize) -> bool {
    text[end..].trim_start().starts_with('.')
}

fn overlaps(claimed: &[Range<usize>], span: &Range<usize>) -> bool {
    claimed.iter().any(|c| c.start < span.end && span.start < c.end)
}

/// Run the cascade over `text` and return the claimed names in text order.
pub fn match_names(text: &str, patterns: &'static [Pattern], budget: MatchBudget) -> Vec<NameMatch> {
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut found = Vec::new();

    for pattern in patterns {
        for Candidate { keyword, name: span } in pattern.find_names(text, budget) {
            if overlaps(&claimed, &span) {
                continue;
            }
            if continues_with_dot(text, span.end) {
                tracing::debug!(pattern = %pattern.id(), name = &text[span.clone()], "head of a longer name; skipped");
                continue;
            }
            // `t.Join AS j`: the keyword is a column, not a clause.
            if is_chain_tail(text, keyword) {
                tracing::debug!(pattern = %pattern.id(), name = &text[span.clone()], "keyword is part of a qualified name; skipped");
                continue;
            }
            let Some(ident) = QualifiedIdent::parse(&text[span.clone()]) else {
                continue;
            };
            if ident.len() != pattern.rank() {
                continue;
            }
            claimed.push(span.clone());
            found.push(NameMatch { span, ident, pattern });
        }
    }

    found.sort_by_key(|m| m.span.start);
    found
}
