//! Permalink patterns.
//!
//! A pattern is a URL template made of literal text and `:name` tokens:
//!
//! ```text
//! /:categories/:year/:month/:day/:title.html
//! ```
//!
//! Tokens are replaced by the document's [`PermalinkVars`]. A token that
//! names no variable is an error; compilation never emits a half-filled URL.
//! The result always starts with a single `/` and has no empty segments.
//!
//! ## Aliases
//!
//! | alias     | expands to                                     |
//! |-----------|------------------------------------------------|
//! | `date`    | `/:categories/:year/:month/:day/:title.html`   |
//! | `pretty`  | `/:categories/:year/:month/:day/:title/`       |
//! | `ordinal` | `/:categories/:year/:y_day/:title.html`        |
//! | `none`    | `/:categories/:title.html`                     |

use crate::naming::{parse_post_name, slugify, trim_ext};
use crate::types::{VariableMap, VariableMapExt};
use chrono::{DateTime, Datelike, FixedOffset};
use std::collections::BTreeMap;
use thiserror::Error;

/// Named permalink styles.
pub const ALIASES: &[(&str, &str)] = &[
    ("date", "/:categories/:year/:month/:day/:title.html"),
    ("pretty", "/:categories/:year/:month/:day/:title/"),
    ("ordinal", "/:categories/:year/:y_day/:title.html"),
    ("none", "/:categories/:title.html"),
];

/// Pattern for documents outside any collection.
pub const DEFAULT_PAGE_PATTERN: &str = "/:path:output_ext";

/// Pattern for documents of collections other than posts.
pub const DEFAULT_COLLECTION_PATTERN: &str = "/:collection/:path:output_ext";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PermalinkError {
    #[error("unknown variable {name:?} in permalink pattern {pattern:?}")]
    UnknownVariable { name: String, pattern: String },
}

/// The canonical template for `pattern` if it is an alias, else `pattern`.
pub fn expand_alias(pattern: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == pattern)
        .map(|(_, template)| *template)
        .unwrap_or(pattern)
}

/// The variables a pattern can reference, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PermalinkVars(BTreeMap<String, String>);

impl PermalinkVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Derive the variable set of one document.
    pub fn for_document(input: &VarInputs<'_>) -> Self {
        let rel = input
            .rel_path
            .strip_prefix(input.path_prefix)
            .unwrap_or(input.rel_path);
        let root = trim_ext(rel);
        let (dir, stem) = match root.rsplit_once('/') {
            Some((dir, stem)) => (dir, stem),
            None => ("", root),
        };
        let name = if input.is_posts {
            parse_post_name(stem).name
        } else {
            stem.to_string()
        };
        let name = slugify(&name);
        let slug = input
            .front_matter
            .string("slug")
            .unwrap_or_else(|| name.clone());

        let mut vars = Self::new();
        vars.insert("path", format!("/{}", root.trim_start_matches('/')));
        vars.insert("name", name);
        vars.insert("title", slug.clone());
        vars.insert("slug", slug);
        vars.insert("output_ext", input.output_ext);
        vars.insert("collection", input.collection.unwrap_or_default());
        vars.insert(
            "categories",
            categories(input.front_matter, input.is_posts.then_some(dir)),
        );
        vars.insert_date(&input.date);
        vars
    }

    fn insert_date(&mut self, date: &DateTime<FixedOffset>) {
        let iso = date.iso_week();
        self.insert("year", date.format("%Y").to_string());
        self.insert("short_year", date.format("%y").to_string());
        self.insert("month", date.format("%m").to_string());
        self.insert("i_month", date.month().to_string());
        self.insert("short_month", date.format("%b").to_string());
        self.insert("long_month", date.format("%B").to_string());
        self.insert("day", date.format("%d").to_string());
        self.insert("i_day", date.day().to_string());
        self.insert("y_day", date.ordinal().to_string());
        self.insert("short_day", date.format("%a").to_string());
        self.insert("long_day", date.format("%A").to_string());
        self.insert("week", format!("{:02}", iso.week()));
        self.insert("w_year", iso.year().to_string());
        self.insert("w_day", date.weekday().number_from_monday().to_string());
        self.insert("hour", date.format("%H").to_string());
        self.insert("minute", date.format("%M").to_string());
        self.insert("second", date.format("%S").to_string());
    }
}

/// Inputs to [`PermalinkVars::for_document`].
#[derive(Debug, Clone)]
pub struct VarInputs<'a> {
    /// Source-relative path with forward slashes.
    pub rel_path: &'a str,
    /// The owning container's directory prefix (`"_posts/"`, or `""`).
    pub path_prefix: &'a str,
    pub collection: Option<&'a str>,
    pub is_posts: bool,
    /// Merged front matter.
    pub front_matter: &'a VariableMap,
    /// `.html` for converted documents, else the source extension.
    pub output_ext: &'a str,
    /// The document's effective date.
    pub date: DateTime<FixedOffset>,
}

/// The `categories` value: explicit front matter categories, sorted, or
/// for posts the directories between the collection root and the file.
fn categories(front_matter: &VariableMap, post_dir: Option<&str>) -> String {
    let mut explicit = front_matter.string_list("categories");
    if let Some(category) = front_matter.string("category") {
        explicit.push(category);
    }
    if !explicit.is_empty() {
        explicit.sort();
        explicit.dedup();
        return explicit.join("/");
    }
    post_dir.unwrap_or_default().trim_matches('/').to_string()
}

/// Compile `pattern` (or an alias) against `vars` into a URL path.
pub fn compile(pattern: &str, vars: &PermalinkVars) -> Result<String, PermalinkError> {
    let template = expand_alias(pattern);
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(colon) = rest.find(':') {
        out.push_str(&rest[..colon]);
        let after = &rest[colon + 1..];
        let ident_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if ident_len == 0 {
            out.push(':');
            rest = after;
            continue;
        }
        let name = &after[..ident_len];
        let value = vars
            .get(name)
            .ok_or_else(|| PermalinkError::UnknownVariable {
                name: name.to_string(),
                pattern: pattern.to_string(),
            })?;
        out.push_str(value);
        rest = &after[ident_len..];
    }
    out.push_str(rest);

    Ok(clean_url_path(&out))
}

/// Collapse runs of `/` and ensure exactly one leading `/`.
pub fn clean_url_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn map(value: Value) -> VariableMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected an object"),
        }
    }

    fn date() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2006-02-03T15:04:05Z").unwrap()
    }

    /// Compile `pattern` for a document at `path`, the way a loose page
    /// with `categories: "b a"` would see it.
    fn expand(pattern: &str, path: &str, fm: &VariableMap) -> Result<String, PermalinkError> {
        let ext = crate::naming::dotted_ext(path);
        let output_ext = if matches!(ext.as_str(), ".md" | ".markdown") {
            ".html".to_string()
        } else {
            ext
        };
        let vars = PermalinkVars::for_document(&VarInputs {
            rel_path: path,
            path_prefix: "",
            collection: fm.string("collection").as_deref(),
            is_posts: false,
            front_matter: fm,
            output_ext: &output_ext,
            date: date(),
        });
        compile(pattern, &vars)
    }

    #[test]
    fn expands_patterns() {
        let fm = map(json!({"categories": "b a"}));
        let cases = [
            ("/a/b/base.html", "/out:output_ext", "/out.html"),
            ("/a/b/base.md", "/out:output_ext", "/out.html"),
            ("/a/b/base.markdown", "/out:output_ext", "/out.html"),
            ("/a/b/base.html", "/:path/out:output_ext", "/a/b/base/out.html"),
            ("/a/b/base.html", "/prefix/:name", "/prefix/base"),
            ("/a/b/base.html", "/prefix/:path/post", "/prefix/a/b/base/post"),
            ("/a/b/base.html", "/prefix/:title", "/prefix/base"),
            ("/a/b/base.html", "/prefix/:slug", "/prefix/base"),
            ("base", "/:categories/:name:output_ext", "/a/b/base"),
            ("base", "date", "/a/b/2006/02/03/base.html"),
            ("base", "pretty", "/a/b/2006/02/03/base/"),
            ("base", "ordinal", "/a/b/2006/34/base.html"),
            ("base", "none", "/a/b/base.html"),
        ];
        for (path, pattern, want) in cases {
            let got = expand(pattern, path, &fm).unwrap();
            assert_eq!(got, want, "pattern={pattern} path={path}");
        }
    }

    #[test]
    fn collection_variables() {
        let fm = map(json!({"categories": "b a", "collection": "c"}));
        assert_eq!(
            expand("/prefix/:collection/post", "/a/b/c.d", &fm).unwrap(),
            "/prefix/c/post"
        );
        assert_eq!(
            expand("/prefix:path/post", "/a/b/c.d", &fm).unwrap(),
            "/prefix/a/b/c/post"
        );
    }

    #[test]
    fn unknown_variable_is_error() {
        let fm = VariableMap::new();
        let err = expand("/:invalid", "/a/b/base.html", &fm).unwrap_err();
        assert_eq!(
            err,
            PermalinkError::UnknownVariable {
                name: "invalid".into(),
                pattern: "/:invalid".into(),
            }
        );
    }

    #[test]
    fn unknown_variable_after_known_ones_is_still_error() {
        let fm = VariableMap::new();
        assert!(expand("/:path/:nope.html", "x.md", &fm).is_err());
    }

    #[test]
    fn compile_is_deterministic() {
        let fm = map(json!({"categories": ["z", "y"], "slug": "Custom"}));
        for pattern in ["date", "pretty", "/:categories/:slug/", "/:path:output_ext"] {
            let first = expand(pattern, "notes/x.md", &fm).unwrap();
            let second = expand(pattern, "notes/x.md", &fm).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn explicit_slug_feeds_title() {
        let fm = map(json!({"slug": "hello-there"}));
        assert_eq!(expand("/:title/", "x.md", &fm).unwrap(), "/hello-there/");
        assert_eq!(expand("/:name/", "x.md", &fm).unwrap(), "/x/");
    }

    #[test]
    fn lone_colon_is_literal() {
        let vars = PermalinkVars::new();
        assert_eq!(compile("/a:/b", &vars).unwrap(), "/a:/b");
        assert_eq!(compile("/a:", &vars).unwrap(), "/a:");
    }

    #[test]
    fn clean_collapses_and_anchors() {
        assert_eq!(clean_url_path("a//b///c"), "/a/b/c");
        assert_eq!(clean_url_path("//x/"), "/x/");
        assert_eq!(clean_url_path(""), "/");
    }

    #[test]
    fn empty_categories_leave_no_gap() {
        let fm = VariableMap::new();
        assert_eq!(
            expand("date", "base.md", &fm).unwrap(),
            "/2006/02/03/base.html"
        );
    }

    #[test]
    fn date_variables() {
        let mut vars = PermalinkVars::new();
        vars.insert_date(&date());
        assert_eq!(vars.get("year"), Some("2006"));
        assert_eq!(vars.get("short_year"), Some("06"));
        assert_eq!(vars.get("month"), Some("02"));
        assert_eq!(vars.get("i_month"), Some("2"));
        assert_eq!(vars.get("short_month"), Some("Feb"));
        assert_eq!(vars.get("long_month"), Some("February"));
        assert_eq!(vars.get("day"), Some("03"));
        assert_eq!(vars.get("i_day"), Some("3"));
        assert_eq!(vars.get("y_day"), Some("34"));
        assert_eq!(vars.get("short_day"), Some("Fri"));
        assert_eq!(vars.get("long_day"), Some("Friday"));
        assert_eq!(vars.get("week"), Some("05"));
        assert_eq!(vars.get("w_year"), Some("2006"));
        assert_eq!(vars.get("w_day"), Some("5"));
        assert_eq!(vars.get("hour"), Some("15"));
        assert_eq!(vars.get("minute"), Some("04"));
        assert_eq!(vars.get("second"), Some("05"));
    }

    #[test]
    fn posts_use_date_stripped_name_and_directory_categories() {
        let fm = VariableMap::new();
        let vars = PermalinkVars::for_document(&VarInputs {
            rel_path: "_posts/a/b/2006-02-03-Base.md",
            path_prefix: "_posts/",
            collection: Some("posts"),
            is_posts: true,
            front_matter: &fm,
            output_ext: ".html",
            date: date(),
        });
        assert_eq!(vars.get("name"), Some("base"));
        assert_eq!(vars.get("categories"), Some("a/b"));
        assert_eq!(vars.get("path"), Some("/a/b/2006-02-03-Base"));
        assert_eq!(vars.get("collection"), Some("posts"));
        assert_eq!(compile("date", &vars).unwrap(), "/a/b/2006/02/03/base.html");
        assert_eq!(compile("pretty", &vars).unwrap(), "/a/b/2006/02/03/base/");
    }

    #[test]
    fn explicit_categories_override_post_directories() {
        let fm = map(json!({"categories": ["news"], "category": "blog"}));
        let vars = PermalinkVars::for_document(&VarInputs {
            rel_path: "_posts/a/2006-02-03-base.md",
            path_prefix: "_posts/",
            collection: Some("posts"),
            is_posts: true,
            front_matter: &fm,
            output_ext: ".html",
            date: date(),
        });
        assert_eq!(vars.get("categories"), Some("blog/news"));
    }

    #[test]
    fn aliases_expand() {
        assert_eq!(expand_alias("pretty"), "/:categories/:year/:month/:day/:title/");
        assert_eq!(expand_alias("/custom/:title"), "/custom/:title");
    }
}
