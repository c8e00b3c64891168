//! Property mappings shared by configuration, front matter, and templates.
//!
//! Everything that Jekyll treats as "a bag of variables" (site config, a
//! defaults entry, a document's front matter, a collection's metadata) is a
//! [`VariableMap`]. Values are kept as `serde_json::Value` so that YAML and
//! TOML sources land in the same representation.

use serde_json::Value;

/// String-keyed property mapping. Keys are unique; inserts replace.
pub type VariableMap = serde_json::Map<String, Value>;

/// Merge `overlay` on top of `base`, key by key.
///
/// Unlike the nested merge used for site configuration files, this is a
/// shallow merge: a nested mapping in `overlay` replaces the one in `base`
/// wholesale.
pub fn merge_variable_maps(mut base: VariableMap, overlay: &VariableMap) -> VariableMap {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
    base
}

/// Typed lookups with Jekyll's lenient coercions.
pub trait VariableMapExt {
    /// Boolean at `key`, or `default` when absent or not a boolean.
    fn bool_or(&self, key: &str, default: bool) -> bool;

    /// String at `key`. Numbers and booleans are rendered as strings.
    fn string(&self, key: &str) -> Option<String>;

    /// A list of strings at `key`.
    ///
    /// Accepts either a sequence (`[a, b]`) or a whitespace-separated string
    /// (`"a b"`), the two forms Jekyll allows for `categories` and `tags`.
    fn string_list(&self, key: &str) -> Vec<String>;
}

impl VariableMapExt for VariableMap {
    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}
