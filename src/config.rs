//! Site configuration module.
//!
//! Handles loading and merging `_config.yml` (or `_config.yaml` /
//! `_config.toml`) from the source root. Stock defaults are the base layer;
//! the user file is merged on top of them, table by table.
//!
//! ## Config File Location
//!
//! ```text
//! site/
//! ├── _config.yml            # Site config (optional)
//! ├── _posts/                # The `posts` collection
//! ├── _recipes/              # Any collection declared under `collections:`
//! ├── about.md               # Loose page
//! └── css/site.css           # Static file (no front matter)
//! ```
//!
//! ## Configuration Options
//!
//! ```yaml
//! # All options are optional - defaults shown below
//! source: .
//! destination: ./_site
//! include: [".htaccess"]
//! exclude: [Gemfile, Gemfile.lock, node_modules, vendor/bundle/, vendor/cache/, vendor/gems/, vendor/ruby/]
//! keep_files: [".git", ".svn"]
//! encoding: utf-8
//! markdown_ext: "markdown,mkdown,mkdn,mkd,md"
//! strict_front_matter: false
//! permalink: date
//! paginate_path: /page:num
//! timezone: null
//! collections:
//!   posts:
//!     output: true
//! defaults: []
//! ```
//!
//! Every key of the merged file, including ones this crate does not
//! interpret, is also kept in [`SiteConfig::variables`] for templates.

use crate::types::VariableMap;
use chrono::FixedOffset;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Config file names probed in the source root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["_config.yml", "_config.yaml", "_config.toml"];

/// Name of the time-series collection.
pub const POSTS_COLLECTION: &str = "posts";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },
    #[error("TOML parse error in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration value: {0}")]
    Value(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `_config.yml`.
///
/// All fields have Jekyll's defaults. Unknown keys are accepted and kept in
/// [`variables`](Self::variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Where things are
    pub source: String,
    pub destination: String,
    pub data_dir: String,
    pub includes_dir: String,
    pub layouts_dir: String,
    /// Collection name → collection metadata (`output`, `permalink`, ...).
    pub collections: BTreeMap<String, VariableMap>,

    // Handling reading
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub keep_files: Vec<String>,
    pub encoding: String,
    /// Comma-separated list of extensions treated as markdown.
    pub markdown_ext: String,
    pub strict_front_matter: bool,

    // Filtering content
    pub show_drafts: bool,
    pub future: bool,
    pub unpublished: bool,

    // Plugins
    pub plugins: Vec<String>,

    // Conversion and outputting
    pub permalink: String,
    pub paginate_path: String,
    pub timezone: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub baseurl: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,

    /// Front matter defaults, applied by the cascade resolver.
    pub defaults: Vec<DefaultsEntry>,

    /// The merged configuration as a plain property map.
    #[serde(skip)]
    pub variables: VariableMap,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let mut collections = BTreeMap::new();
        let mut posts = VariableMap::new();
        posts.insert("output".into(), Value::Bool(true));
        collections.insert(POSTS_COLLECTION.to_string(), posts);

        Self {
            source: ".".into(),
            destination: "./_site".into(),
            data_dir: "_data".into(),
            includes_dir: "_includes".into(),
            layouts_dir: "_layouts".into(),
            collections,
            include: vec![".htaccess".into()],
            exclude: [
                "Gemfile",
                "Gemfile.lock",
                "node_modules",
                "vendor/bundle/",
                "vendor/cache/",
                "vendor/gems/",
                "vendor/ruby/",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            keep_files: vec![".git".into(), ".svn".into()],
            encoding: "utf-8".into(),
            markdown_ext: "markdown,mkdown,mkdn,mkd,md".into(),
            strict_front_matter: false,
            show_drafts: false,
            future: false,
            unpublished: false,
            plugins: Vec::new(),
            permalink: "date".into(),
            paginate_path: "/page:num".into(),
            timezone: None,
            baseurl: String::new(),
            url: String::new(),
            defaults: Vec::new(),
            variables: VariableMap::new(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of the `defaults:` list.
///
/// ```yaml
/// defaults:
///   - scope:
///       path: "projects"
///       type: "pages"
///     values:
///       layout: "project"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsEntry {
    pub scope: DefaultsScope,
    pub values: VariableMap,
}

/// Where a [`DefaultsEntry`] applies. Both parts are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsScope {
    /// Source-relative path prefix. Empty matches everything.
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    /// Document type: `pages`, `posts`, `drafts`, or a collection name.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Build-time overrides, applied after the configuration file is loaded.
///
/// Each field is optional so that only explicitly set flags override the
/// configured value.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub destination: Option<String>,
    pub unpublished: Option<bool>,
    pub drafts: Option<bool>,
    pub future: Option<bool>,
}

impl SiteConfig {
    /// Overwrite configured values with any flags that were set.
    pub fn apply_flags(&mut self, flags: &Flags) {
        if let Some(destination) = &flags.destination {
            self.destination = destination.clone();
        }
        if let Some(drafts) = flags.drafts {
            self.show_drafts = drafts;
        }
        if let Some(future) = flags.future {
            self.future = future;
        }
        if let Some(unpublished) = flags.unpublished {
            self.unpublished = unpublished;
        }
    }

    /// Validate values this crate interprets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markdown_extensions().is_empty() {
            return Err(ConfigError::Validation(
                "markdown_ext must list at least one extension".into(),
            ));
        }
        if self.permalink.trim().is_empty() {
            return Err(ConfigError::Validation("permalink must not be empty".into()));
        }
        if !self.encoding.eq_ignore_ascii_case("utf-8") {
            return Err(ConfigError::Validation(format!(
                "unsupported encoding {:?}; only utf-8 is supported",
                self.encoding
            )));
        }
        if let Some(name) = self
            .collections
            .keys()
            .find(|name| name.is_empty() || name.contains(['/', '\\']))
        {
            return Err(ConfigError::Validation(format!(
                "invalid collection name {name:?}"
            )));
        }
        Ok(())
    }

    /// The `markdown_ext` list, lowercased, without dots.
    pub fn markdown_extensions(&self) -> Vec<String> {
        self.markdown_ext
            .split(',')
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    /// True when `ext` (with or without a leading dot) is a markdown extension.
    pub fn is_markdown_ext(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.markdown_extensions()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(ext))
    }

    /// True when the site excludes `rel`, a path relative to the source root.
    ///
    /// `include` wins over everything; `exclude` entries match the path or
    /// any directory above it; otherwise names starting with `.` or `_` are
    /// excluded.
    pub fn exclude(&self, rel: &Path) -> bool {
        let rel_str = to_slash(rel);
        if rel_str.is_empty() || rel_str == "." {
            return false;
        }
        let base = rel
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self
            .include
            .iter()
            .any(|entry| entry == &rel_str || entry == &base)
        {
            return false;
        }
        if self
            .exclude
            .iter()
            .any(|entry| path_matches_entry(&rel_str, entry))
        {
            return true;
        }
        base.starts_with('.') || base.starts_with('_')
    }

    /// True when cleaning the destination should leave `rel` in place.
    pub fn keep_file(&self, rel: &Path) -> bool {
        let rel_str = to_slash(rel);
        self.keep_files
            .iter()
            .any(|entry| path_matches_entry(&rel_str, entry))
    }

    /// The fixed offset named by `timezone`.
    ///
    /// `None` (the default) and `UTC` give a zero offset. Explicit offsets
    /// such as `+05:30` are honoured. Named zones return `None`.
    pub fn time_offset(&self) -> Option<FixedOffset> {
        let Some(tz) = self.timezone.as_deref().map(str::trim) else {
            return FixedOffset::east_opt(0);
        };
        match tz {
            "" | "UTC" | "Etc/UTC" | "Z" => FixedOffset::east_opt(0),
            _ => crate::dates::parse_offset(tz),
        }
    }

    /// Metadata for `name`, if the collection is configured.
    pub fn collection(&self, name: &str) -> Option<&VariableMap> {
        self.collections.get(name)
    }
}

fn path_matches_entry(rel: &str, entry: &str) -> bool {
    let entry = entry.trim_end_matches('/');
    !entry.is_empty()
        && (rel == entry || rel.strip_prefix(entry).is_some_and(|r| r.starts_with('/')))
}

/// Render a relative path with forward slashes.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// Config loading and merging
// =============================================================================

/// Returns the stock default config as a JSON object value.
///
/// This is the base layer that user configuration is merged onto.
pub fn stock_defaults_value() -> Value {
    serde_json::to_value(SiteConfig::default()).unwrap_or(Value::Object(VariableMap::new()))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Objects are merged key-by-key (overlay keys override base keys).
/// - Non-object values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_values(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Find the config file in `root`, if any.
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.is_file())
}

/// Parse a config file into a raw value, choosing the format by extension.
///
/// An empty file is an empty mapping.
pub fn load_raw_config(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value = if path.extension().is_some_and(|e| e == "toml") {
        let table: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        toml_to_json(table)
    } else {
        serde_yaml_ng::from_str::<Value>(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };
    match value {
        Value::Null => Ok(Value::Object(VariableMap::new())),
        Value::Object(_) => Ok(value),
        _ => Err(ConfigError::Validation(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(base: Value, overlay: Option<Value>) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_values(base, ov),
        None => base,
    };
    let mut config: SiteConfig = serde_json::from_value(merged.clone())?;
    config.variables = match merged {
        Value::Object(map) => map,
        _ => VariableMap::new(),
    };
    config.validate()?;
    Ok(config)
}

/// Load the site config from `root`.
///
/// Returns the stock defaults when no config file exists. Returns the path of
/// the file that was read alongside the config.
pub fn load_config(root: &Path) -> Result<(SiteConfig, Option<PathBuf>), ConfigError> {
    let file = find_config_file(root);
    let overlay = file.as_deref().map(load_raw_config).transpose()?;
    let config = resolve_config(stock_defaults_value(), overlay)?;
    Ok((config, file))
}

/// Convert a TOML value into the shared JSON representation.
///
/// Datetimes become their RFC 3339 string form, the same shape a YAML date
/// has after parsing.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Worker count for the read pool.
///
/// Caps at the number of available CPU cores; `--jobs` can constrain down,
/// not up.
pub fn effective_threads(jobs: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    jobs.filter(|&n| n > 0).map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns a fully-commented stock `_config.yml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_yaml() -> &'static str {
    r##"# Site configuration
# ==================
# All settings are optional. Values shown below are the defaults.

# ---------------------------------------------------------------------------
# Where things are
# ---------------------------------------------------------------------------
source: .
destination: ./_site
data_dir: _data
includes_dir: _includes
layouts_dir: _layouts

# A collection named X is read from the _X/ directory.
# Documents of collections with `output: true` get a URL.
collections:
  posts:
    output: true

# ---------------------------------------------------------------------------
# Handling reading
# ---------------------------------------------------------------------------
include: [".htaccess"]
exclude: [Gemfile, Gemfile.lock, node_modules, vendor/bundle/, vendor/cache/, vendor/gems/, vendor/ruby/]
keep_files: [".git", ".svn"]
encoding: "utf-8"
markdown_ext: "markdown,mkdown,mkdn,mkd,md"
# When true, invalid front matter always aborts the build.
strict_front_matter: false

# ---------------------------------------------------------------------------
# Filtering content
# ---------------------------------------------------------------------------
show_drafts: false
future: false
unpublished: false

# ---------------------------------------------------------------------------
# Plugins (jekyll-avatar, jekyll-gist)
# ---------------------------------------------------------------------------
plugins: []

# ---------------------------------------------------------------------------
# Outputting
# ---------------------------------------------------------------------------
# A pattern such as /:categories/:year/:title/ or one of:
# date, pretty, ordinal, none
permalink: date
paginate_path: /page:num
# null, UTC, or a fixed offset such as +01:00
timezone: null
baseurl: ""
url: ""

# Front matter defaults, most specific scope wins:
# defaults:
#   - scope:
#       path: ""
#       type: posts
#     values:
#       layout: post
defaults: []
"##
}
