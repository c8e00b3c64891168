//! The site-wide URL registry.
//!
//! Maps every published URL to the one source file that produces it, and
//! back. The registry is rebuilt from scratch on every read pass; it is
//! never patched in place.
//!
//! Inserting a URL that already belongs to a *different* source file is a
//! [`RegistryError::Collision`]; nothing is overwritten. Re-inserting the same
//! pair is a no-op.

use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("URL {url} is produced by both {existing} and {incoming}")]
    Collision {
        url: String,
        existing: String,
        incoming: String,
    },
}

/// URL → source path, with the reverse index for link resolution.
#[derive(Debug, Clone, Default)]
pub struct PathRegistry {
    by_url: BTreeMap<String, String>,
    by_source: HashMap<String, String>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from collected `(url, source)` pairs.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.merge(pairs)?;
        Ok(registry)
    }

    /// Register `source` at `url`.
    pub fn insert(
        &mut self,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let url = url.into();
        let source = source.into();
        if let Some(existing) = self.by_url.get(&url) {
            if *existing == source {
                return Ok(());
            }
            return Err(RegistryError::Collision {
                url,
                existing: existing.clone(),
                incoming: source,
            });
        }
        self.by_source.insert(source.clone(), url.clone());
        self.by_url.insert(url, source);
        Ok(())
    }

    /// Insert many pairs at once.
    ///
    /// Pairs are sorted first, so the outcome (including which two paths a
    /// collision error names, and in which order) does not depend on the
    /// order the pairs were produced in.
    pub fn merge(&mut self, mut pairs: Vec<(String, String)>) -> Result<(), RegistryError> {
        pairs.sort();
        for (url, source) in pairs {
            self.insert(url, source)?;
        }
        Ok(())
    }

    /// The URL of a published source path.
    pub fn url_for(&self, source: &str) -> Option<&str> {
        self.by_source.get(source).map(String::as_str)
    }

    /// The source path published at `url`.
    pub fn source_for(&self, url: &str) -> Option<&str> {
        self.by_url.get(url).map(String::as_str)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }

    /// `(url, source)` pairs in URL order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_url.iter().map(|(u, s)| (u.as_str(), s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(url: &str, source: &str) -> (String, String) {
        (url.to_string(), source.to_string())
    }

    #[test]
    fn insert_and_lookup_both_ways() {
        let mut r = PathRegistry::new();
        r.insert("/about.html", "about.md").unwrap();
        assert_eq!(r.url_for("about.md"), Some("/about.html"));
        assert_eq!(r.source_for("/about.html"), Some("about.md"));
        assert_eq!(r.url_for("missing.md"), None);
        assert!(r.contains_url("/about.html"));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn collision_names_both_sources() {
        let mut r = PathRegistry::new();
        r.insert("/x.html", "x.md").unwrap();
        let err = r.insert("/x.html", "x.html").unwrap_err();
        assert_eq!(
            err,
            RegistryError::Collision {
                url: "/x.html".into(),
                existing: "x.md".into(),
                incoming: "x.html".into(),
            }
        );
        let message = err.to_string();
        assert!(message.contains("x.md") && message.contains("x.html"));
        // The first mapping survives.
        assert_eq!(r.source_for("/x.html"), Some("x.md"));
    }

    #[test]
    fn reinserting_same_pair_is_noop() {
        let mut r = PathRegistry::new();
        r.insert("/a/", "a.md").unwrap();
        r.insert("/a/", "a.md").unwrap();
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn merge_collision_is_order_independent() {
        let forward = vec![pair("/x.html", "b.md"), pair("/x.html", "a.md")];
        let backward = vec![pair("/x.html", "a.md"), pair("/x.html", "b.md")];
        let e1 = PathRegistry::from_pairs(forward).unwrap_err();
        let e2 = PathRegistry::from_pairs(backward).unwrap_err();
        assert_eq!(e1, e2);
        assert_eq!(
            e1,
            RegistryError::Collision {
                url: "/x.html".into(),
                existing: "a.md".into(),
                incoming: "b.md".into(),
            }
        );
    }

    #[test]
    fn iter_is_url_ordered() {
        let r = PathRegistry::from_pairs(vec![
            pair("/b.html", "b.md"),
            pair("/a.html", "a.md"),
        ])
        .unwrap();
        let urls: Vec<&str> = r.iter().map(|(u, _)| u).collect();
        assert_eq!(urls, vec!["/a.html", "/b.html"]);
    }
}
