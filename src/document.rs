//! Documents: one source file, one identity.
//!
//! Reading a file decides three things, in this order:
//!
//! ```text
//! bytes ──► front matter?  ── no ──► static file (URL = source path)
//!                │
//!               yes
//!                ▼
//!          cascade merge ──► effective date ──► permalink
//!                                 │
//!                                 ▼
//!                        publish eligibility
//! ```
//!
//! A [`Document`] is immutable once read. Its permalink is computed exactly
//! once, from the merged front matter and the owning [`Container`].

use crate::cascade::{self, CascadeTarget, DRAFTS_TYPE};
use crate::collection::Container;
use crate::config::SiteConfig;
use crate::dates::{self, DateSource, EffectiveDate};
use crate::frontmatter::{self, FrontMatterError};
use crate::naming::{dotted_ext, parse_post_name, trim_ext};
use crate::permalink::{self, PermalinkError, PermalinkVars, VarInputs};
use crate::types::{VariableMap, VariableMapExt};
use chrono::{DateTime, FixedOffset};
use rayon::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    FrontMatter {
        path: String,
        source: FrontMatterError,
    },
    #[error("{path}: {source}")]
    Permalink {
        path: String,
        source: PermalinkError,
    },
}

impl DocumentError {
    /// True for errors caused by a malformed file rather than the filesystem.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, DocumentError::FrontMatter { .. })
    }
}

/// What a read pass does with files whose front matter cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// The first malformed file aborts the pass.
    #[default]
    FailFast,
    /// Malformed files are logged, counted, and left out.
    SkipInvalid,
}

/// Everything a read pass shares across documents.
#[derive(Debug, Clone, Copy)]
pub struct ReadContext<'a> {
    pub config: &'a SiteConfig,
    /// Absolute source root.
    pub source: &'a Path,
    /// The reference instant for the future-dated gate.
    pub now: DateTime<FixedOffset>,
    /// Offset for dates written without one.
    pub offset: FixedOffset,
    pub policy: ReadPolicy,
}

/// The outcome of reading a batch of files.
#[derive(Debug, Default)]
pub struct ReadBatch {
    /// Every document read, eligible or not, in input order.
    pub documents: Vec<Document>,
    /// Source paths skipped under [`ReadPolicy::SkipInvalid`].
    pub invalid: Vec<String>,
}

/// Read `rel_paths` on the rayon pool.
///
/// Results come back in input order. Under [`ReadPolicy::FailFast`] the
/// error reported is the one for the earliest failing path, so a failing
/// pass fails the same way every time.
pub fn read_documents(
    ctx: &ReadContext<'_>,
    container: &dyn Container,
    rel_paths: &[String],
    draft: bool,
) -> Result<ReadBatch, DocumentError> {
    let results: Vec<Result<Document, DocumentError>> = rel_paths
        .par_iter()
        .map(|rel| read_document(ctx, container, rel, draft))
        .collect();

    let mut batch = ReadBatch::default();
    for result in results {
        match result {
            Ok(doc) => batch.documents.push(doc),
            Err(DocumentError::FrontMatter { path, source })
                if ctx.policy == ReadPolicy::SkipInvalid =>
            {
                log::warn!("skipping {path}: {source}");
                batch.invalid.push(path);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(batch)
}

/// A source file with its resolved identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    rel_path: String,
    collection: Option<String>,
    front_matter: VariableMap,
    permalink: String,
    output_ext: String,
    date: EffectiveDate,
    mod_time: DateTime<FixedOffset>,
    is_static: bool,
    published: bool,
    draft: bool,
    future: bool,
    eligible: bool,
}

impl Document {
    /// Source-relative path with forward slashes.
    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// The merged front matter. Empty for static files.
    pub fn front_matter(&self) -> &VariableMap {
        &self.front_matter
    }

    /// The URL path this document is published at.
    pub fn permalink(&self) -> &str {
        &self.permalink
    }

    pub fn output_ext(&self) -> &str {
        &self.output_ext
    }

    pub fn date(&self) -> DateTime<FixedOffset> {
        self.date.value
    }

    pub fn date_source(&self) -> DateSource {
        self.date.source
    }

    pub fn mod_time(&self) -> DateTime<FixedOffset> {
        self.mod_time
    }

    /// True for files without front matter; these are copied verbatim.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// The `published` front matter flag (default `true`).
    pub fn published(&self) -> bool {
        self.published
    }

    pub fn is_draft(&self) -> bool {
        self.draft
    }

    /// True when an explicit date lies after the read pass's `now`.
    pub fn is_future(&self) -> bool {
        self.future
    }

    /// True when the document should be published under the site's policy.
    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// True when the source is converted from Markdown.
    pub fn is_markdown(&self, config: &SiteConfig) -> bool {
        !self.is_static && config.is_markdown_ext(&dotted_ext(&self.rel_path))
    }

    /// The variables exposed to templates for this document.
    ///
    /// Front matter keys plus the computed `url`, `path` and `date`. The
    /// computed keys always win.
    pub fn to_variables(&self) -> VariableMap {
        let mut vars = self.front_matter.clone();
        vars.insert("url".into(), Value::String(self.permalink.clone()));
        vars.insert("path".into(), Value::String(self.rel_path.clone()));
        vars.insert("date".into(), Value::String(self.date.value.to_rfc3339()));
        if let Some(name) = &self.collection {
            vars.insert("collection".into(), Value::String(name.clone()));
        }
        if self.draft {
            vars.insert("draft".into(), Value::Bool(true));
        }
        vars
    }
}

/// Read `rel_path` as a member of `container`.
///
/// `draft` marks files read from the drafts directory; their path prefix is
/// `_drafts/` rather than the container's.
pub fn read_document(
    ctx: &ReadContext<'_>,
    container: &dyn Container,
    rel_path: &str,
    draft: bool,
) -> Result<Document, DocumentError> {
    let abs = ctx.source.join(rel_path);
    let io_err = |source| DocumentError::Io {
        path: abs.clone(),
        source,
    };
    let bytes = fs::read(&abs).map_err(io_err)?;
    let modified = fs::metadata(&abs)
        .and_then(|m| m.modified())
        .map_err(io_err)?;
    let mod_time = dates::from_system_time(modified, ctx.offset);

    let split = frontmatter::split(&bytes).map_err(|source| DocumentError::FrontMatter {
        path: rel_path.to_string(),
        source,
    })?;
    let Some(split) = split else {
        return Ok(static_document(rel_path, container, mod_time));
    };

    let layer = container.collection_layer();
    let mut types: Vec<&str> = vec![container.document_type()];
    if draft {
        types.push(DRAFTS_TYPE);
    }
    let merged = cascade::resolve(
        &ctx.config.defaults,
        &CascadeTarget {
            rel_path,
            types: &types,
            collection: layer,
        },
        &split.front_matter,
    );

    let path_prefix = if draft {
        "_drafts/"
    } else {
        container.path_prefix()
    };
    let is_posts = container.is_posts();
    let date = effective_date(ctx, rel_path, &merged, is_posts || draft, mod_time);

    let source_ext = dotted_ext(rel_path);
    let output_ext = if ctx.config.is_markdown_ext(&source_ext) {
        ".html".to_string()
    } else {
        source_ext
    };

    let pattern = merged
        .string("permalink")
        .unwrap_or_else(|| container.default_permalink(ctx.config).to_string());
    let vars = PermalinkVars::for_document(&VarInputs {
        rel_path,
        path_prefix,
        collection: layer.map(|l| l.name),
        is_posts: is_posts || draft,
        front_matter: &merged,
        output_ext: &output_ext,
        date: date.value,
    });
    let permalink = permalink::compile(&pattern, &vars).map_err(|source| {
        DocumentError::Permalink {
            path: rel_path.to_string(),
            source,
        }
    })?;

    let published = merged.bool_or("published", true);
    let draft = draft || merged.bool_or("draft", false);
    let future = date.source.is_explicit() && date.value > ctx.now;
    let eligible = (published || ctx.config.unpublished)
        && (!draft || ctx.config.show_drafts)
        && (!future || ctx.config.future);

    log::debug!("{rel_path} → {permalink}");
    Ok(Document {
        rel_path: rel_path.to_string(),
        collection: layer.map(|l| l.name.to_string()),
        front_matter: merged,
        permalink,
        output_ext,
        date,
        mod_time,
        is_static: false,
        published,
        draft,
        future,
        eligible,
    })
}

fn static_document(rel_path: &str, container: &dyn Container, mod_time: DateTime<FixedOffset>) -> Document {
    Document {
        rel_path: rel_path.to_string(),
        collection: container.collection_layer().map(|l| l.name.to_string()),
        front_matter: VariableMap::new(),
        permalink: permalink::clean_url_path(rel_path),
        output_ext: dotted_ext(rel_path),
        date: EffectiveDate {
            value: mod_time,
            source: DateSource::ModTime,
        },
        mod_time,
        is_static: true,
        published: true,
        draft: false,
        future: false,
        eligible: true,
    }
}

/// Front matter `date`, else a post's filename date, else the mtime.
fn effective_date(
    ctx: &ReadContext<'_>,
    rel_path: &str,
    merged: &VariableMap,
    dated_names: bool,
    mod_time: DateTime<FixedOffset>,
) -> EffectiveDate {
    if let Some(raw) = merged.get("date") {
        match dates::date_from_value(raw, ctx.offset) {
            Some(value) => {
                return EffectiveDate {
                    value,
                    source: DateSource::FrontMatter,
                };
            }
            None => log::warn!("{rel_path}: ignoring unparseable date {raw}"),
        }
    }
    if dated_names {
        let root = trim_ext(rel_path);
        let stem = root.rsplit('/').next().unwrap_or(root);
        if let Some(value) = parse_post_name(stem)
            .date
            .and_then(|d| dates::at_midnight(d, ctx.offset))
        {
            return EffectiveDate {
                value,
                source: DateSource::Filename,
            };
        }
    }
    EffectiveDate {
        value: mod_time,
        source: DateSource::ModTime,
    }
}
