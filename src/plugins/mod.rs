//! Plugin capabilities: template tags and filters.
//!
//! Plugins contribute named capabilities to one shared name table. The table
//! is filled once, by [`install`], and then frozen:
//!
//! ```text
//! CapabilityRegistry ──install(names)──► register_tag / register_filter
//!         │
//!      freeze()
//!         ▼
//!   Capabilities      (read-only; render_tag / apply_filter)
//! ```
//!
//! A name can only be taken once across tags and filters. Registering it
//! again is [`PluginError::AlreadyRegistered`]; there is no silent override.
//!
//! Known plugins:
//!
//! | name            | provides                                   |
//! |-----------------|--------------------------------------------|
//! | `jekyll-gist`   | `{% gist id [file] %}`                     |
//! | `jekyll-avatar` | `{% avatar user [size=N] %}`               |
//!
//! The Jekyll filters in [`filters`] are always installed.

pub mod args;
pub mod avatar;
pub mod filters;
pub mod gist;

pub use args::TagArgs;

use crate::config::SiteConfig;
use crate::types::VariableMap;
use chrono::{FixedOffset, Offset, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PluginError {
    #[error("capability {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("unknown tag {0:?}")]
    UnknownTag(String),
    #[error("unknown filter {0:?}")]
    UnknownFilter(String),
    #[error("{tag} tag: {message}")]
    Tag { tag: String, message: String },
    #[error("{filter} filter: {message}")]
    Filter { filter: String, message: String },
}

/// What a tag or filter can see while rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Variables visible to tag arguments (`page`, `site`, …).
    pub bindings: &'a VariableMap,
    pub baseurl: &'a str,
    /// Absolute site URL, without the base path.
    pub url: &'a str,
    /// Offset for dates written without one.
    pub offset: FixedOffset,
}

impl<'a> RenderContext<'a> {
    pub fn new(bindings: &'a VariableMap) -> Self {
        Self {
            bindings,
            baseurl: "",
            url: "",
            offset: Utc.fix(),
        }
    }

    pub fn for_site(config: &'a SiteConfig, bindings: &'a VariableMap, offset: FixedOffset) -> Self {
        Self {
            bindings,
            baseurl: &config.baseurl,
            url: &config.url,
            offset,
        }
    }
}

/// Renders a tag from its argument line.
pub type TagFn = fn(&TagArgs, &RenderContext<'_>) -> Result<String, PluginError>;

/// Transforms a value; the slice holds the filter's own arguments.
pub type FilterFn = fn(&Value, &[Value], &RenderContext<'_>) -> Result<Value, PluginError>;

#[derive(Clone, Copy)]
enum Capability {
    Tag(TagFn),
    Filter(FilterFn),
}

/// The mutable name table, used during initialization only.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tag(&mut self, name: &str, tag: TagFn) -> Result<(), PluginError> {
        self.register(name, Capability::Tag(tag))
    }

    pub fn register_filter(&mut self, name: &str, filter: FilterFn) -> Result<(), PluginError> {
        self.register(name, Capability::Filter(filter))
    }

    fn register(&mut self, name: &str, capability: Capability) -> Result<(), PluginError> {
        if self.entries.contains_key(name) {
            return Err(PluginError::AlreadyRegistered(name.to_string()));
        }
        self.entries.insert(name.to_string(), capability);
        Ok(())
    }

    /// End initialization. The result cannot be extended.
    pub fn freeze(self) -> Capabilities {
        Capabilities {
            entries: self.entries,
        }
    }
}

/// The frozen name table.
#[derive(Clone, Default)]
pub struct Capabilities {
    entries: BTreeMap<String, Capability>,
}

impl Capabilities {
    pub fn has_tag(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Capability::Tag(_)))
    }

    pub fn has_filter(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Capability::Filter(_)))
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(name, c)| match c {
            Capability::Tag(_) => Some(name.as_str()),
            Capability::Filter(_) => None,
        })
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(name, c)| match c {
            Capability::Filter(_) => Some(name.as_str()),
            Capability::Tag(_) => None,
        })
    }

    /// Render tag `name` with the raw argument line `line`.
    pub fn render_tag(
        &self,
        name: &str,
        line: &str,
        ctx: &RenderContext<'_>,
    ) -> Result<String, PluginError> {
        let Some(Capability::Tag(tag)) = self.entries.get(name) else {
            return Err(PluginError::UnknownTag(name.to_string()));
        };
        let args = TagArgs::parse(name, line)?;
        tag(&args, ctx)
    }

    pub fn apply_filter(
        &self,
        name: &str,
        input: &Value,
        args: &[Value],
        ctx: &RenderContext<'_>,
    ) -> Result<Value, PluginError> {
        let Some(Capability::Filter(filter)) = self.entries.get(name) else {
            return Err(PluginError::UnknownFilter(name.to_string()));
        };
        filter(input, args, ctx)
    }
}

type InstallFn = fn(&mut CapabilityRegistry) -> Result<(), PluginError>;

/// Plugins that can be named in the `plugins` config list.
const KNOWN_PLUGINS: &[(&str, InstallFn)] = &[
    ("jekyll-avatar", avatar::install),
    ("jekyll-gist", gist::install),
];

/// True when `name` is a plugin [`install`] knows.
pub fn is_known(name: &str) -> bool {
    KNOWN_PLUGINS.iter().any(|(known, _)| *known == name)
}

/// Register the built-in filters, then each named plugin.
///
/// Unknown plugin names are logged and skipped. Returns the names of the
/// plugins that were installed.
pub fn install(names: &[String], registry: &mut CapabilityRegistry) -> Result<Vec<String>, PluginError> {
    filters::install(registry)?;
    let mut installed = Vec::new();
    for name in names {
        match KNOWN_PLUGINS.iter().find(|(known, _)| *known == name.as_str()) {
            Some((_, install_plugin)) => {
                install_plugin(registry)?;
                log::debug!("installed plugin {name}");
                installed.push(name.clone());
            }
            None => log::warn!("unknown plugin {name:?}; skipping"),
        }
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shout(args: &TagArgs, _ctx: &RenderContext<'_>) -> Result<String, PluginError> {
        Ok(args.positional.join(" ").to_uppercase())
    }

    fn identity(input: &Value, _args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
        Ok(input.clone())
    }

    #[test]
    fn one_name_table_for_tags_and_filters() {
        let mut registry = CapabilityRegistry::new();
        registry.register_tag("x", shout).unwrap();
        assert_eq!(
            registry.register_filter("x", identity),
            Err(PluginError::AlreadyRegistered("x".into()))
        );
        assert_eq!(
            registry.register_tag("x", shout),
            Err(PluginError::AlreadyRegistered("x".into()))
        );
    }

    #[test]
    fn frozen_table_dispatches_by_kind() {
        let mut registry = CapabilityRegistry::new();
        registry.register_tag("shout", shout).unwrap();
        registry.register_filter("same", identity).unwrap();
        let caps = registry.freeze();
        let bindings = VariableMap::new();
        let ctx = RenderContext::new(&bindings);

        assert_eq!(caps.render_tag("shout", "hi there", &ctx).unwrap(), "HI THERE");
        assert_eq!(caps.apply_filter("same", &json!(3), &[], &ctx).unwrap(), json!(3));
        assert!(caps.has_tag("shout") && !caps.has_filter("shout"));
        assert_eq!(
            caps.render_tag("same", "", &ctx),
            Err(PluginError::UnknownTag("same".into()))
        );
        assert_eq!(
            caps.apply_filter("nope", &json!(1), &[], &ctx),
            Err(PluginError::UnknownFilter("nope".into()))
        );
    }

    #[test]
    fn install_skips_unknown_plugins() {
        let mut registry = CapabilityRegistry::new();
        let installed = install(
            &["jekyll-gist".into(), "jekyll-nonexistent".into()],
            &mut registry,
        )
        .unwrap();
        assert_eq!(installed, vec!["jekyll-gist"]);
        let caps = registry.freeze();
        assert!(caps.has_tag("gist"));
        assert!(!caps.has_tag("avatar"));
        assert!(caps.has_filter("jsonify"));
    }

    #[test]
    fn installing_a_plugin_twice_is_a_collision() {
        let mut registry = CapabilityRegistry::new();
        let err = install(&["jekyll-gist".into(), "jekyll-gist".into()], &mut registry)
            .unwrap_err();
        assert_eq!(err, PluginError::AlreadyRegistered("gist".into()));
    }

    #[test]
    fn known_plugins() {
        assert!(is_known("jekyll-avatar"));
        assert!(!is_known("jekyll-feed"));
    }
}
