//! Input normalization.
//!
//! Every extraction and rewrite starts from [`normalize`], which removes the
//! noise that would otherwise confuse clause detection: comments, `USE`
//! statements, batch separators and a leading CTE prologue.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Comments plus the quoted spans that may legally contain `--` or `/*`.
static COMMENT_OR_QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)'(?:[^']|'')*'|"(?:[^"]|"")*"|\[[^\]]*\]|--[^\r\n]*|/\*.*?(?:\*/|\z)"#)
        .expect("comment regex is valid")
});

static USE_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?im)^[ \t]*USE\s+(?:\[[^\]]*\]|"[^"]*"|[\w@#$]+)[ \t]*;?"#)
        .expect("USE regex is valid")
});

static BATCH_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*GO(?:[ \t]+\d+)?[ \t]*;?[ \t]*$").expect("GO regex is valid")
});

static CTE_PROLOGUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^;?\s*WITH\s+(?:\[[^\]]+\]|"[^"]+"|[\w@#$]+)(?:\s*\([^)]*\))?\s+AS\s*\(.*?\)\s*(?P<select>SELECT)\b"#,
    )
    .expect("CTE regex is valid")
});

/// Remove comments, `USE`/`GO` noise and a leading CTE prologue, then trim.
///
/// Comments become a single space. Running it twice changes nothing.
///
/// ```
/// use qail_lens::preprocess::normalize;
///
/// let sql = "USE Sales;\nGO\nSELECT Id -- key\nFROM Orders";
/// assert_eq!(normalize(sql), "SELECT Id  \nFROM Orders");
/// ```
pub fn normalize(sql: &str) -> String {
    let without_comments = strip_comments(sql);
    let without_use = USE_STATEMENT.replace_all(&without_comments, "");
    let without_go = BATCH_SEPARATOR.replace_all(&without_use, "");
    let trimmed = without_go.trim();
    let without_cte = strip_cte_prologue(trimmed);
    without_cte.trim().to_string()
}

/// Replace every `--` and `/* */` comment with one space, leaving quoted
/// literals and identifiers untouched.
pub fn strip_comments(sql: &str) -> String {
    COMMENT_OR_QUOTED
        .replace_all(sql, |caps: &Captures| {
            let m = &caps[0];
            if m.starts_with("--") || m.starts_with("/*") {
                " ".to_string()
            } else {
                m.to_string()
            }
        })
        .into_owned()
}

/// Drop a single leading `WITH name AS ( ... )` prologue so the text starts
/// at the outer `SELECT`. Nested CTEs go with it.
pub fn strip_cte_prologue(sql: &str) -> String {
    CTE_PROLOGUE.replace(sql, "$select").into_owned()
}
