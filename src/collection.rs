//! Containers: the site root and its named collections.
//!
//! Every document belongs to exactly one [`Container`]. The container decides
//! the document's cascade layer, its default permalink pattern, and whether
//! its members are routed at all:
//!
//! ```text
//! container        dir          prefix        default pattern
//! ──────────────   ──────────   ───────────   ──────────────────────────────
//! SiteRoot         ./           ""            /:path:output_ext
//! posts            _posts/      "_posts/"     site `permalink` (date)
//! <name>           _<name>/     "_<name>/"    /:collection/:path:output_ext
//! ```
//!
//! Collections with `output: false` are still read and listed; they just
//! contribute no URLs.

use crate::cascade::{CollectionLayer, PAGES_TYPE};
use crate::config::{POSTS_COLLECTION, SiteConfig, to_slash};
use crate::document::{Document, ReadBatch, ReadContext, read_documents};
use crate::permalink::{DEFAULT_COLLECTION_PATTERN, DEFAULT_PAGE_PATTERN};
use crate::site::{ReadStats, SiteError};
use crate::types::{VariableMap, VariableMapExt};
use std::path::Path;
use walkdir::WalkDir;

/// Directory holding unpublished posts.
pub const DRAFTS_DIR: &str = "_drafts";

/// The shared surface of the site root and collections.
pub trait Container: Sync {
    /// Whether members get URLs.
    fn is_output_enabled(&self) -> bool;

    /// Directory prefix stripped from member paths for `:path`.
    fn path_prefix(&self) -> &str;

    /// The cascade layer this container contributes, if any.
    fn collection_layer(&self) -> Option<CollectionLayer<'_>>;

    /// The name a defaults entry's `scope.type` must use.
    fn document_type(&self) -> &str;

    /// Pattern for members whose front matter sets no `permalink`.
    fn default_permalink<'a>(&'a self, config: &'a SiteConfig) -> &'a str;

    fn is_posts(&self) -> bool {
        false
    }
}

/// Documents outside any collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteRoot;

impl Container for SiteRoot {
    fn is_output_enabled(&self) -> bool {
        true
    }

    fn path_prefix(&self) -> &str {
        ""
    }

    fn collection_layer(&self) -> Option<CollectionLayer<'_>> {
        None
    }

    fn document_type(&self) -> &str {
        PAGES_TYPE
    }

    fn default_permalink<'a>(&'a self, _config: &'a SiteConfig) -> &'a str {
        DEFAULT_PAGE_PATTERN
    }
}

/// A named collection and its eligible members.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    metadata: VariableMap,
    prefix: String,
    documents: Vec<Document>,
}

impl Collection {
    pub fn new(name: impl Into<String>, metadata: VariableMap) -> Self {
        let name = name.into();
        let prefix = format!("_{name}/");
        Self {
            name,
            metadata,
            prefix,
            documents: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &VariableMap {
        &self.metadata
    }

    /// Eligible members. Posts are ordered by date, others by path.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// `(url, source)` pairs for the registry. Empty when output is off.
    pub fn routes(&self) -> Vec<(String, String)> {
        if !self.is_output_enabled() {
            return Vec::new();
        }
        self.documents
            .iter()
            .map(|d| (d.permalink().to_string(), d.rel_path().to_string()))
            .collect()
    }

    /// Read the collection directory (and `_drafts/` for posts when drafts
    /// are shown), replacing any previous members.
    pub fn read(&mut self, ctx: &ReadContext<'_>) -> Result<ReadStats, SiteError> {
        let mut stats = ReadStats::default();
        let mut documents = Vec::new();

        let dir = ctx.source.join(&self.prefix);
        if dir.is_dir() {
            let paths = walk_members(ctx.source, &dir)?;
            let batch = read_documents(ctx, &*self, &paths, false)?;
            self.absorb(batch, &mut documents, &mut stats);
        } else if !self.is_posts() {
            log::warn!(
                "Missing directory for collection {}: {}",
                self.name,
                dir.display()
            );
        }

        if self.is_posts() && ctx.config.show_drafts {
            let drafts = ctx.source.join(DRAFTS_DIR);
            if drafts.is_dir() {
                let paths = walk_members(ctx.source, &drafts)?;
                let batch = read_documents(ctx, &*self, &paths, true)?;
                self.absorb(batch, &mut documents, &mut stats);
            }
        }

        if self.is_posts() {
            documents.sort_by(|a, b| {
                a.date()
                    .cmp(&b.date())
                    .then_with(|| a.rel_path().cmp(b.rel_path()))
            });
        }
        log::debug!("collection {}: {} documents", self.name, documents.len());
        self.documents = documents;
        Ok(stats)
    }

    fn absorb(&self, batch: ReadBatch, into: &mut Vec<Document>, stats: &mut ReadStats) {
        stats.invalid += batch.invalid.len();
        for doc in batch.documents {
            if doc.is_static() {
                log::info!(
                    "{}: no front matter, skipping static file in collection {}",
                    doc.rel_path(),
                    self.name
                );
                stats.static_files += 1;
            } else if !doc.is_eligible() {
                stats.unpublished += 1;
            } else {
                stats.documents += 1;
                into.push(doc);
            }
        }
    }
}

impl Container for Collection {
    fn is_output_enabled(&self) -> bool {
        self.metadata.bool_or("output", self.is_posts())
    }

    fn path_prefix(&self) -> &str {
        &self.prefix
    }

    fn collection_layer(&self) -> Option<CollectionLayer<'_>> {
        Some(CollectionLayer {
            name: &self.name,
            metadata: &self.metadata,
        })
    }

    fn document_type(&self) -> &str {
        &self.name
    }

    fn default_permalink<'a>(&'a self, config: &'a SiteConfig) -> &'a str {
        if self.is_posts() {
            &config.permalink
        } else {
            DEFAULT_COLLECTION_PATTERN
        }
    }

    fn is_posts(&self) -> bool {
        self.name == POSTS_COLLECTION
    }
}

/// Files under `dir` as source-relative paths, sorted, skipping dot names.
/// Symlinks are followed.
fn walk_members(source: &Path, dir: &Path) -> Result<Vec<String>, walkdir::Error> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
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
        if let Ok(rel) = entry.path().strip_prefix(source) {
            paths.push(to_slash(rel));
        }
    }
    Ok(paths)
}
