//! The site: configuration, containers, and the URL registry.
//!
//! A read pass runs in three steps:
//!
//! ```text
//! 1. Walk     source/         →  candidate paths    (sequential, sorted)
//! 2. Read     candidate paths →  documents          (rayon, per container)
//! 3. Merge    routes          →  PathRegistry       (single thread, sorted)
//! ```
//!
//! Only the merge step touches shared state, so the registry's contents and
//! any collision error are the same whatever order the pool finishes in.
//! A pass either succeeds and replaces the previous state wholesale, or
//! fails and leaves it untouched.

use crate::collection::{Collection, Container, SiteRoot};
use crate::config::{self, ConfigError, Flags, SiteConfig, to_slash};
use crate::document::{Document, DocumentError, ReadContext, ReadPolicy, read_documents};
use crate::registry::{PathRegistry, RegistryError};
use crate::types::VariableMap;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// Counts from one read pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Eligible documents with front matter.
    pub documents: usize,
    /// Static files (at the root: routed; in collections: skipped).
    pub static_files: usize,
    /// Documents left out by the publishing policy.
    pub unpublished: usize,
    /// Files skipped for malformed front matter.
    pub invalid: usize,
}

impl ReadStats {
    pub fn add(&mut self, other: ReadStats) {
        self.documents += other.documents;
        self.static_files += other.static_files;
        self.unpublished += other.unpublished;
        self.invalid += other.invalid;
    }
}

#[derive(Debug, Clone, Copy)]
enum DocRef {
    Page(usize),
    Member(usize, usize),
}

pub struct Site {
    config: SiteConfig,
    config_file: Option<PathBuf>,
    source: PathBuf,
    destination: PathBuf,
    now: Option<DateTime<FixedOffset>>,
    pages: Vec<Document>,
    collections: Vec<Collection>,
    by_path: HashMap<String, DocRef>,
    registry: PathRegistry,
}

impl Site {
    /// A site rooted at `dir` with an already-resolved configuration.
    ///
    /// `config.source` is taken relative to `dir`, and `config.destination`
    /// relative to the source.
    pub fn new(dir: &Path, config: SiteConfig, config_file: Option<PathBuf>) -> Self {
        let source = dir.join(&config.source);
        let destination = source.join(&config.destination);
        Self {
            config,
            config_file,
            source,
            destination,
            now: None,
            pages: Vec::new(),
            collections: Vec::new(),
            by_path: HashMap::new(),
            registry: PathRegistry::new(),
        }
    }

    /// Load the configuration found in `dir`, apply `flags`, and validate.
    pub fn from_directory(dir: &Path, flags: &Flags) -> Result<Self, SiteError> {
        if !dir.is_dir() {
            return Err(SiteError::SourceNotFound(dir.to_path_buf()));
        }
        let (mut config, config_file) = config::load_config(dir)?;
        config.apply_flags(flags);
        config.validate()?;
        Ok(Self::new(dir, config, config_file))
    }

    /// Pin the instant the future-dated gate compares against.
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Offset for dates written without one.
    ///
    /// Named time zones are not resolved; they fall back to UTC.
    pub fn time_offset(&self) -> FixedOffset {
        self.config.time_offset().unwrap_or_else(|| {
            log::warn!(
                "timezone {:?} is not a fixed offset; using UTC",
                self.config.timezone.as_deref().unwrap_or_default()
            );
            Utc.fix()
        })
    }

    /// Read the whole source tree and rebuild the registry.
    ///
    /// `strict_front_matter: true` in the config forces
    /// [`ReadPolicy::FailFast`] whatever `policy` says.
    pub fn read_files(&mut self, policy: ReadPolicy) -> Result<ReadStats, SiteError> {
        let offset = self.time_offset();
        let now = self
            .now
            .unwrap_or_else(|| Utc::now().with_timezone(&offset));
        let policy = if self.config.strict_front_matter {
            ReadPolicy::FailFast
        } else {
            policy
        };
        let ctx = ReadContext {
            config: &self.config,
            source: &self.source,
            now,
            offset,
            policy,
        };

        let paths = self.walk_source()?;
        log::debug!("{} candidate files under {}", paths.len(), self.source.display());
        let batch = read_documents(&ctx, &SiteRoot, &paths, false)?;

        let mut stats = ReadStats {
            invalid: batch.invalid.len(),
            ..ReadStats::default()
        };
        let mut pages = Vec::new();
        for doc in batch.documents {
            if !doc.is_eligible() {
                stats.unpublished += 1;
                continue;
            }
            if doc.is_static() {
                stats.static_files += 1;
            } else {
                stats.documents += 1;
            }
            pages.push(doc);
        }

        let mut collections = Vec::new();
        for (name, metadata) in &self.config.collections {
            let mut collection = Collection::new(name.clone(), metadata.clone());
            stats.add(collection.read(&ctx)?);
            collections.push(collection);
        }

        let mut routes: Vec<(String, String)> = pages
            .iter()
            .map(|d| (d.permalink().to_string(), d.rel_path().to_string()))
            .collect();
        for collection in &collections {
            routes.extend(collection.routes());
        }
        let registry = PathRegistry::from_pairs(routes)?;

        let mut by_path = HashMap::new();
        for (i, doc) in pages.iter().enumerate() {
            by_path.insert(doc.rel_path().to_string(), DocRef::Page(i));
        }
        for (c, collection) in collections.iter().enumerate() {
            for (i, doc) in collection.documents().iter().enumerate() {
                by_path.insert(doc.rel_path().to_string(), DocRef::Member(c, i));
            }
        }

        log::info!(
            "read {} documents, {} static files, {} URLs",
            stats.documents,
            stats.static_files,
            registry.len()
        );
        self.pages = pages;
        self.collections = collections;
        self.by_path = by_path;
        self.registry = registry;
        Ok(stats)
    }

    /// Candidate files under the source root as relative paths, sorted.
    ///
    /// Excluded entries and the destination directory are pruned whole.
    /// Symlinks are followed; a link back into its own ancestry is skipped.
    fn walk_source(&self) -> Result<Vec<String>, walkdir::Error> {
        let destination = self
            .destination
            .strip_prefix(&self.source)
            .ok()
            .map(to_slash)
            .filter(|d| !d.is_empty());
        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.source)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let Ok(rel) = e.path().strip_prefix(&self.source) else {
                    return true;
                };
                if e.depth() == 0 {
                    return true;
                }
                if destination.as_deref() == Some(to_slash(rel).as_str()) {
                    return false;
                }
                !self.config.exclude(rel)
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.loop_ancestor().is_some() => {
                    log::warn!("Skipping symlink loop: {err}");
                    continue;
                }
                Err(err) => return Err(err),
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.source) {
                paths.push(to_slash(rel));
            }
        }
        Ok(paths)
    }

    /// Eligible documents and static files outside any collection.
    pub fn pages(&self) -> &[Document] {
        &self.pages
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name() == name)
    }

    pub fn registry(&self) -> &PathRegistry {
        &self.registry
    }

    /// Every eligible document, pages first, then collections by name.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.pages
            .iter()
            .chain(self.collections.iter().flat_map(|c| c.documents()))
    }

    /// The eligible document read from `rel_path`.
    pub fn document(&self, rel_path: &str) -> Option<&Document> {
        match *self.by_path.get(rel_path)? {
            DocRef::Page(i) => self.pages.get(i),
            DocRef::Member(c, i) => self.collections.get(c)?.documents().get(i),
        }
    }

    /// The URL `rel_path` is published at, if it is published.
    pub fn file_url(&self, rel_path: &str) -> Option<&str> {
        self.registry.url_for(rel_path)
    }

    /// The document published at `url`.
    pub fn route(&self, url: &str) -> Option<&Document> {
        self.document(self.registry.source_for(url)?)
    }

    /// `(url, document)` for every route, in URL order.
    pub fn routes(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.registry
            .iter()
            .filter_map(|(url, source)| self.document(source).map(|d| (url, d)))
    }

    /// The `site` variables exposed to templates.
    pub fn template_variables(&self) -> VariableMap {
        let mut vars = self.config.variables.clone();

        let offset = self.time_offset();
        let now = self
            .now
            .unwrap_or_else(|| Utc::now().with_timezone(&offset));
        vars.insert("time".into(), Value::String(now.to_rfc3339()));
        vars.insert(
            "pages".into(),
            to_list(self.pages.iter().filter(|d| !d.is_static())),
        );
        vars.insert(
            "static_files".into(),
            Value::Array(
                self.pages
                    .iter()
                    .filter(|d| d.is_static())
                    .map(|d| Value::String(d.permalink().to_string()))
                    .collect(),
            ),
        );
        vars.insert(
            "documents".into(),
            to_list(self.collections.iter().flat_map(|c| c.documents())),
        );
        for collection in &self.collections {
            vars.insert(
                collection.name().to_string(),
                to_list(collection.documents().iter()),
            );
        }
        vars.insert(
            "collections".into(),
            Value::Array(
                self.collections
                    .iter()
                    .map(|c| {
                        let mut meta = c.metadata().clone();
                        meta.insert("label".into(), Value::String(c.name().to_string()));
                        meta.insert("output".into(), Value::Bool(c.is_output_enabled()));
                        Value::Object(meta)
                    })
                    .collect(),
            ),
        );
        vars
    }
}

fn to_list<'a>(docs: impl Iterator<Item = &'a Document>) -> Value {
    Value::Array(docs.map(|d| Value::Object(d.to_variables())).collect())
}
