//! Front matter cascade resolution.
//!
//! A document's properties are assembled from four layers, lowest first.
//! Later layers override earlier ones key by key; nested values are replaced
//! wholesale, never deep-merged.
//!
//! ```text
//! 1. defaults with no scope            (site-wide)
//! 2. defaults whose scope matches      (shorter path first, typed after untyped)
//! 3. the owning collection's metadata  (+ `collection: <name>`)
//! 4. the document's own front matter   (always wins)
//! ```
//!
//! Among matching scoped defaults the longest path prefix wins. At equal
//! prefix length an entry with a `type` outranks one without, and remaining
//! ties go to the entry declared last.

use crate::config::DefaultsEntry;
use crate::types::{VariableMap, merge_variable_maps};
use serde_json::Value;

/// Type name of documents outside any collection.
pub const PAGES_TYPE: &str = "pages";

/// Type name that additionally matches draft posts.
pub const DRAFTS_TYPE: &str = "drafts";

/// The collection layer of the cascade.
#[derive(Debug, Clone, Copy)]
pub struct CollectionLayer<'a> {
    pub name: &'a str,
    pub metadata: &'a VariableMap,
}

/// What the cascade needs to know about a document.
#[derive(Debug, Clone, Copy)]
pub struct CascadeTarget<'a> {
    /// Source-relative path with forward slashes.
    pub rel_path: &'a str,
    /// Document types the `scope.type` of a defaults entry may name.
    pub types: &'a [&'a str],
    pub collection: Option<CollectionLayer<'a>>,
}

/// Merge all layers into one property mapping.
pub fn resolve(
    defaults: &[DefaultsEntry],
    target: &CascadeTarget<'_>,
    explicit: &VariableMap,
) -> VariableMap {
    let mut merged = scoped_defaults(defaults, target.rel_path, target.types);
    if let Some(layer) = target.collection {
        merged = merge_variable_maps(merged, layer.metadata);
        merged.insert("collection".into(), Value::String(layer.name.to_string()));
    }
    merge_variable_maps(merged, explicit)
}

/// Layers 1 and 2: every matching defaults entry, least specific first.
pub fn scoped_defaults(defaults: &[DefaultsEntry], rel_path: &str, types: &[&str]) -> VariableMap {
    let mut matching: Vec<(usize, bool, &DefaultsEntry)> = defaults
        .iter()
        .filter(|entry| applies(entry, rel_path, types))
        .map(|entry| {
            (
                normalize_scope_path(&entry.scope.path).len(),
                entry.scope.kind.is_some(),
                entry,
            )
        })
        .collect();
    // Stable: equal specificity keeps declaration order, so the last wins.
    matching.sort_by_key(|&(len, typed, _)| (len, typed));

    matching
        .into_iter()
        .fold(VariableMap::new(), |acc, (_, _, entry)| {
            merge_variable_maps(acc, &entry.values)
        })
}

fn applies(entry: &DefaultsEntry, rel_path: &str, types: &[&str]) -> bool {
    let type_ok = match entry.scope.kind.as_deref() {
        None | Some("") => true,
        Some(kind) => types.contains(&kind),
    };
    type_ok && path_applies(&entry.scope.path, rel_path)
}

/// True when `scope` names `rel_path` or one of its parent directories.
///
/// A `*` segment in the scope matches any single path segment.
pub fn path_applies(scope: &str, rel_path: &str) -> bool {
    let scope = normalize_scope_path(scope);
    if scope.is_empty() {
        return true;
    }
    let path = normalize_scope_path(rel_path);
    let mut path_segments = path.split('/');
    scope.split('/').all(|want| match path_segments.next() {
        Some(have) => want == "*" || want == have,
        None => false,
    })
}

fn normalize_scope_path(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultsScope;
    use serde_json::json;

    fn map(value: Value) -> VariableMap {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected an object"),
        }
    }

    fn entry(path: &str, kind: Option<&str>, values: Value) -> DefaultsEntry {
        DefaultsEntry {
            scope: DefaultsScope {
                path: path.into(),
                kind: kind.map(String::from),
            },
            values: map(values),
        }
    }

    fn page<'a>(rel_path: &'a str) -> CascadeTarget<'a> {
        CascadeTarget {
            rel_path,
            types: &[PAGES_TYPE],
            collection: None,
        }
    }

    #[test]
    fn precedence_site_scoped_explicit() {
        let defaults = vec![
            entry("", None, json!({"a": 1})),
            entry("blog/2020", None, json!({"a": 2})),
        ];
        let target = page("blog/2020/post.md");

        let explicit = map(json!({"a": 3}));
        assert_eq!(resolve(&defaults, &target, &explicit)["a"], json!(3));

        let none = VariableMap::new();
        assert_eq!(resolve(&defaults, &target, &none)["a"], json!(2));

        let site_only = vec![defaults[0].clone()];
        assert_eq!(resolve(&site_only, &target, &none)["a"], json!(1));
    }

    #[test]
    fn longest_prefix_wins_regardless_of_declaration_order() {
        let defaults = vec![
            entry("blog/2020", None, json!({"layout": "deep"})),
            entry("blog", None, json!({"layout": "shallow", "author": "x"})),
        ];
        let merged = resolve(&defaults, &page("blog/2020/a.md"), &VariableMap::new());
        assert_eq!(merged["layout"], json!("deep"));
        // Less specific entries still contribute keys nobody overrides.
        assert_eq!(merged["author"], json!("x"));
    }

    #[test]
    fn ties_go_to_last_declared() {
        let defaults = vec![
            entry("blog", None, json!({"layout": "first"})),
            entry("blog/", None, json!({"layout": "second"})),
        ];
        let merged = resolve(&defaults, &page("blog/a.md"), &VariableMap::new());
        assert_eq!(merged["layout"], json!("second"));
    }

    #[test]
    fn typed_entry_outranks_untyped_at_same_length() {
        let defaults = vec![
            entry("", Some("pages"), json!({"layout": "typed"})),
            entry("", None, json!({"layout": "untyped"})),
        ];
        let merged = resolve(&defaults, &page("a.md"), &VariableMap::new());
        assert_eq!(merged["layout"], json!("typed"));
    }

    #[test]
    fn type_must_match() {
        let defaults = vec![entry("", Some("posts"), json!({"layout": "post"}))];
        assert!(resolve(&defaults, &page("a.md"), &VariableMap::new()).is_empty());
    }

    #[test]
    fn path_matches_whole_segments_only() {
        assert!(path_applies("blog", "blog/a.md"));
        assert!(path_applies("./blog/", "blog/a.md"));
        assert!(path_applies("", "anything"));
        assert!(!path_applies("blog", "blogs/a.md"));
        assert!(!path_applies("blog/a.md/x", "blog/a.md"));
        assert!(path_applies("_posts/*/drafts", "_posts/2020/drafts/x.md"));
    }

    #[test]
    fn collection_layer_sits_between_defaults_and_explicit() {
        let defaults = vec![entry("", Some("recipes"), json!({"layout": "d", "x": 1}))];
        let metadata = map(json!({"output": true, "layout": "c"}));
        let target = CascadeTarget {
            rel_path: "_recipes/cake.md",
            types: &["recipes"],
            collection: Some(CollectionLayer {
                name: "recipes",
                metadata: &metadata,
            }),
        };
        let merged = resolve(&defaults, &target, &map(json!({"x": 2})));
        assert_eq!(merged["layout"], json!("c"));
        assert_eq!(merged["collection"], json!("recipes"));
        assert_eq!(merged["output"], json!(true));
        assert_eq!(merged["x"], json!(2));
    }

    #[test]
    fn explicit_collection_key_wins() {
        let metadata = VariableMap::new();
        let target = CascadeTarget {
            rel_path: "_c/x.md",
            types: &["c"],
            collection: Some(CollectionLayer {
                name: "c",
                metadata: &metadata,
            }),
        };
        let merged = resolve(&[], &target, &map(json!({"collection": "other"})));
        assert_eq!(merged["collection"], json!("other"));
    }

    #[test]
    fn nested_values_are_replaced_not_merged() {
        let defaults = vec![entry("", None, json!({"author": {"name": "a", "url": "u"}}))];
        let merged = resolve(
            &defaults,
            &page("x.md"),
            &map(json!({"author": {"name": "b"}})),
        );
        assert_eq!(merged["author"], json!({"name": "b"}));
    }
}
