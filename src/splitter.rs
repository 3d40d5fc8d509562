//! Depth-aware splitting of SQL fragments.
//!
//! Both splitters walk the text once, tracking parenthesis depth and quoted
//! spans (`'..'`, `".."`, `[..]`). Delimiters only count at depth 0 outside
//! quotes, so `CONCAT(a, b)` and `'x, y'` stay in one piece.

use std::ops::Range;
use std::str::CharIndices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
    Bracket,
}

/// Iterator over the characters of `text` that sit at parenthesis depth 0
/// and outside any quoted span.
///
/// Opening quotes and parentheses at depth 0 are yielded themselves; their
/// contents are not. Unbalanced `)` never drives the depth below zero.
pub(crate) struct TopLevel<'a> {
    chars: CharIndices<'a>,
    depth: usize,
    quote: Quote,
}

impl<'a> TopLevel<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices(),
            depth: 0,
            quote: Quote::None,
        }
    }
}

impl Iterator for TopLevel<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        for (i, c) in self.chars.by_ref() {
            let closing = match self.quote {
                Quote::Single => Some('\''),
                Quote::Double => Some('"'),
                Quote::Bracket => Some(']'),
                Quote::None => None,
            };
            if let Some(close) = closing {
                if c == close {
                    self.quote = Quote::None;
                }
                continue;
            }

            let at_top = self.depth == 0;
            match c {
                '\'' => self.quote = Quote::Single,
                '"' => self.quote = Quote::Double,
                '[' => self.quote = Quote::Bracket,
                '(' => self.depth += 1,
                ')' => {
                    self.depth = self.depth.saturating_sub(1);
                    continue;
                }
                _ => {}
            }
            if at_top {
                return Some((i, c));
            }
        }
        None
    }
}

/// Characters that can continue a T-SQL word.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
}

/// Match `word` case-insensitively at byte offset `at`.
fn word_at(text: &str, at: usize, word: &str) -> Option<usize> {
    let end = at + word.len();
    text.get(at..end)
        .filter(|s| s.eq_ignore_ascii_case(word))
        .map(|_| end)
}

/// Match a possibly multi-word keyword (`"ORDER BY"`) at `at`, allowing any
/// run of whitespace between its words. Returns the end offset.
pub(crate) fn keyword_at(text: &str, at: usize, keyword: &str) -> Option<usize> {
    if text[..at].chars().next_back().is_some_and(is_word_char) {
        return None;
    }

    let mut pos = at;
    for (n, word) in keyword.split(' ').enumerate() {
        if n > 0 {
            let rest = &text[pos..];
            let skipped = rest.len() - rest.trim_start().len();
            if skipped == 0 {
                return None;
            }
            pos += skipped;
        }
        pos = word_at(text, pos, word)?;
    }

    if text[pos..].chars().next().is_some_and(is_word_char) {
        return None;
    }
    Some(pos)
}

/// Find the first top-level occurrence of `keyword` starting at or after `from`.
pub(crate) fn find_keyword(text: &str, from: usize, keyword: &str) -> Option<Range<usize>> {
    TopLevel::new(text)
        .filter(|&(i, c)| i >= from && c.is_ascii_alphabetic())
        .find_map(|(i, _)| keyword_at(text, i, keyword).map(|end| i..end))
}

/// Find the earliest top-level occurrence of any of `keywords` at or after `from`.
pub(crate) fn find_any_keyword(text: &str, from: usize, keywords: &[&str]) -> Option<Range<usize>> {
    TopLevel::new(text)
        .filter(|&(i, c)| i >= from && c.is_ascii_alphabetic())
        .find_map(|(i, _)| {
            keywords
                .iter()
                .find_map(|kw| keyword_at(text, i, kw))
                .map(|end| i..end)
        })
}

fn push_fragment(out: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        out.push(fragment.to_string());
    }
}

/// Split a SELECT list (or any comma list) on depth-0 commas.
///
/// Fragments are trimmed and empty ones are dropped, so re-joining with
/// commas reproduces the input only when it has no empty items: `a,,b`
/// comes back as `a,b`.
///
/// ```
/// use qail_lens::splitter::split_columns;
///
/// let cols = split_columns("u.Id, CONCAT(u.First, ' ', u.Last) AS Name");
/// assert_eq!(cols, vec!["u.Id", "CONCAT(u.First, ' ', u.Last) AS Name"]);
///
/// assert_eq!(split_columns("a,,b,").join(","), "a,b");
/// ```
pub fn split_columns(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in TopLevel::new(text) {
        if c == ',' {
            push_fragment(&mut out, &text[start..i]);
            start = i + 1;
        }
    }
    push_fragment(&mut out, &text[start..]);
    out
}

/// Split a predicate on depth-0 `AND` / `OR` connectives.
///
/// Connectives must be whole words with whitespace (or the ends of the text)
/// on both sides, so `BRAND = 1` or `x=1 AND(y=2)` are not split there. The
/// `AND` that belongs to `BETWEEN a AND b` is skipped.
pub fn split_predicates(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut pending_between = false;
    let mut skip_until = 0;

    for (i, c) in TopLevel::new(text) {
        if i < skip_until || !c.is_alphabetic() {
            continue;
        }
        if text[..i].chars().next_back().is_some_and(is_word_char) {
            continue;
        }

        let word_len = text[i..]
            .find(|ch: char| !is_word_char(ch))
            .unwrap_or(text.len() - i);
        let word = &text[i..i + word_len];
        skip_until = i + word_len;

        if word.eq_ignore_ascii_case("BETWEEN") {
            pending_between = true;
            continue;
        }

        let is_and = word.eq_ignore_ascii_case("AND");
        if !is_and && !word.eq_ignore_ascii_case("OR") {
            continue;
        }

        let spaced_before = i == 0 || text[..i].chars().next_back().is_some_and(char::is_whitespace);
        let spaced_after = text[i + word_len..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace);
        if !spaced_before || !spaced_after {
            continue;
        }

        if is_and && pending_between {
            pending_between = false;
            continue;
        }

        push_fragment(&mut out, &text[start..i]);
        start = i + word_len;
        pending_between = false;
    }

    push_fragment(&mut out, &text[start..]);
    out
}
