//! Centralized filename parsing.
//!
//! Posts follow the `YYYY-MM-DD-name.ext` convention: a date prefix followed
//! by a name. Every other document uses its file stem as its name. This
//! module provides the parsing used by the permalink variables so that the
//! name, date, and extension of a file are derived in one place.
//!
//! ## Slugs
//!
//! Names are slugified for URLs: non-ASCII text is transliterated first
//! (`café` → `cafe`), then runs of characters that are not ASCII letters or
//! digits collapse to a single dash, and the result is lowercased.
//! - `2006-02-03-Hello-World.md` → name `Hello-World`, slug `hello-world`
//! - `My Notes (draft).md` → slug `my-notes-draft`

use chrono::NaiveDate;
use deunicode::deunicode;
use std::path::Path;

/// Result of parsing a post filename stem like `2006-02-03-base`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPostName {
    /// Date prefix, if the stem starts with a valid `YYYY-MM-DD-`.
    pub date: Option<NaiveDate>,
    /// Everything after the date prefix. For undated stems, the full input.
    pub name: String,
}

/// Parse a file stem following the `YYYY-MM-DD-name` convention.
///
/// - `"2006-02-03-base"` → date=Some(2006-02-03), name="base"
/// - `"2006-02-03-"` → date=Some(2006-02-03), name=""
/// - `"2006-02-30-base"` → date=None, name="2006-02-30-base" (invalid date)
/// - `"notes"` → date=None, name="notes"
pub fn parse_post_name(stem: &str) -> ParsedPostName {
    if stem.len() >= 11 && stem.is_char_boundary(10) && stem.as_bytes()[10] == b'-' {
        if let Ok(date) = NaiveDate::parse_from_str(&stem[..10], "%Y-%m-%d") {
            return ParsedPostName {
                date: Some(date),
                name: stem[11..].to_string(),
            };
        }
    }
    ParsedPostName {
        date: None,
        name: stem.to_string(),
    }
}

/// Slugify a name for use in a URL.
pub fn slugify(s: &str) -> String {
    let ascii = deunicode(s);
    let mut out = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// The extension of `path` with its leading dot (`".md"`), or `""`.
pub fn dotted_ext(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// `path` with its extension removed. Directory components are kept.
pub fn trim_ext(path: &str) -> &str {
    let ext = dotted_ext(path);
    &path[..path.len() - ext.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_post_name() {
        let p = parse_post_name("2006-02-03-base");
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2006, 2, 3));
        assert_eq!(p.name, "base");
    }

    #[test]
    fn dated_post_with_dashes_in_name() {
        let p = parse_post_name("2017-06-30-my-best-post");
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2017, 6, 30));
        assert_eq!(p.name, "my-best-post");
    }

    #[test]
    fn date_with_empty_name() {
        let p = parse_post_name("2006-02-03-");
        assert!(p.date.is_some());
        assert_eq!(p.name, "");
    }

    #[test]
    fn invalid_date_is_part_of_name() {
        let p = parse_post_name("2006-02-30-base");
        assert_eq!(p.date, None);
        assert_eq!(p.name, "2006-02-30-base");
    }

    #[test]
    fn date_only_without_dash() {
        let p = parse_post_name("2006-02-03");
        assert_eq!(p.date, None);
        assert_eq!(p.name, "2006-02-03");
    }

    #[test]
    fn undated_name() {
        let p = parse_post_name("notes");
        assert_eq!(p.date, None);
        assert_eq!(p.name, "notes");
    }

    #[test]
    fn multibyte_stem_does_not_panic() {
        let p = parse_post_name("ééééééééééé-x");
        assert_eq!(p.date, None);
    }

    #[test]
    fn slugify_collapses_and_lowercases() {
        assert_eq!(slugify("base"), "base");
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("My Notes (draft)"), "my-notes-draft");
        assert_eq!(slugify("--a__b--"), "a-b");
    }

    #[test]
    fn slugify_transliterates() {
        assert_eq!(slugify("café"), "cafe");
        assert_eq!(slugify("Über Größe"), "uber-grosse");
        assert_ne!(slugify("café"), slugify("caf"));
    }

    #[test]
    fn extensions() {
        assert_eq!(dotted_ext("a/b/base.md"), ".md");
        assert_eq!(dotted_ext("a/b/base"), "");
        assert_eq!(dotted_ext(".htaccess"), "");
        assert_eq!(trim_ext("a/b/base.html"), "a/b/base");
        assert_eq!(trim_ext("a/b.d/base"), "a/b.d/base");
        assert_eq!(trim_ext("/a/b/c.d"), "/a/b/c");
    }
}
