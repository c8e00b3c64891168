//! Writing the site.
//!
//! Every route in the registry becomes one file under the destination:
//!
//! ```text
//! URL                    written to
//! ─────────────────────  ──────────────────────────────
//! /about.html            _site/about.html
//! /2006/02/03/base/      _site/2006/02/03/base/index.html
//! /css/site.css          _site/css/site.css   (copied verbatim)
//! ```
//!
//! Markdown bodies are converted with pulldown-cmark. Other documents keep
//! their body as-is. Registered tags (`{% gist … %}`, `{% avatar … %}`) are
//! expanded in both; unregistered tags are left in place. Layouts and full
//! Liquid evaluation are not applied.
//!
//! Before writing, the destination is emptied except for `keep_files`.

use crate::config::to_slash;
use crate::document::Document;
use crate::frontmatter;
use crate::plugins::{Capabilities, PluginError, RenderContext};
use crate::site::Site;
use crate::types::VariableMap;
use pulldown_cmark::{Parser, html as md_html};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk destination: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{path}: {source}")]
    Plugin { path: String, source: PluginError },
    #[error("{path}: front matter changed since the site was read")]
    Stale { path: String },
    #[error("URL {0} escapes the destination directory")]
    UnsafeUrl(String),
    #[error("Destination {} would overwrite the source", .0.display())]
    UnsafeDestination(PathBuf),
}

/// What a generate pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    /// `(url, destination-relative path)` per written file, in URL order.
    pub written: Vec<(String, String)>,
    /// Static files among `written`.
    pub copied: usize,
    /// Stale files removed from the destination.
    pub removed: usize,
}

/// Convert Markdown to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}

/// The destination-relative file a URL is written to.
///
/// A URL ending in `/` gets `index.html`.
pub fn output_path(url: &str) -> Result<PathBuf, GenerateError> {
    let trimmed = url.trim_start_matches('/');
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(GenerateError::UnsafeUrl(url.to_string()));
    }
    let mut path = PathBuf::from(trimmed);
    if trimmed.is_empty() || trimmed.ends_with('/') {
        path.push("index.html");
    }
    Ok(path)
}

/// Write every route of `site` under its destination.
pub fn generate(site: &Site, capabilities: &Capabilities) -> Result<GenerateSummary, GenerateError> {
    let destination = site.destination();
    if site.source().starts_with(destination) {
        return Err(GenerateError::UnsafeDestination(destination.to_path_buf()));
    }
    let mut summary = GenerateSummary {
        removed: clean_destination(site)?,
        ..GenerateSummary::default()
    };
    fs::create_dir_all(destination)?;

    let site_vars = Value::Object(site.template_variables());
    let offset = site.time_offset();

    for (url, doc) in site.routes() {
        let rel = output_path(url)?;
        let target = destination.join(&rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let source = site.source().join(doc.rel_path());
        if doc.is_static() {
            fs::copy(&source, &target)?;
            summary.copied += 1;
        } else {
            let mut bindings = VariableMap::new();
            bindings.insert("page".into(), Value::Object(doc.to_variables()));
            bindings.insert("site".into(), site_vars.clone());
            let ctx = RenderContext::for_site(site.config(), &bindings, offset);
            let html = render(site, doc, &source, capabilities, &ctx)?;
            fs::write(&target, html)?;
        }
        log::debug!("wrote {}", target.display());
        summary.written.push((url.to_string(), to_slash(&rel)));
    }

    log::info!(
        "generated {} files ({} copied) in {}",
        summary.written.len(),
        summary.copied,
        destination.display()
    );
    Ok(summary)
}

fn render(
    site: &Site,
    doc: &Document,
    source: &Path,
    capabilities: &Capabilities,
    ctx: &RenderContext<'_>,
) -> Result<String, GenerateError> {
    let bytes = fs::read(source)?;
    let split = frontmatter::split(&bytes)
        .ok()
        .flatten()
        .ok_or_else(|| GenerateError::Stale {
            path: doc.rel_path().to_string(),
        })?;
    let body = String::from_utf8_lossy(split.body);
    let body = expand_tags(&body, capabilities, ctx).map_err(|source| GenerateError::Plugin {
        path: doc.rel_path().to_string(),
        source,
    })?;
    if doc.is_markdown(site.config()) {
        Ok(markdown_to_html(&body))
    } else {
        Ok(body)
    }
}

/// Replace each `{% name args %}` whose `name` is a registered tag.
pub fn expand_tags(
    text: &str,
    capabilities: &Capabilities,
    ctx: &RenderContext<'_>,
) -> Result<String, PluginError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{%") {
        let open = start + 2;
        let Some(len) = rest[open..].find("%}") else {
            break;
        };
        let end = open + len + 2;
        let inner = rest[open..open + len].trim();
        let (name, line) = inner
            .split_once(char::is_whitespace)
            .unwrap_or((inner, ""));
        out.push_str(&rest[..start]);
        if capabilities.has_tag(name) {
            out.push_str(&capabilities.render_tag(name, line.trim(), ctx)?);
        } else {
            out.push_str(&rest[start..end]);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Remove everything under the destination except `keep_files`.
///
/// Returns the number of files removed.
fn clean_destination(site: &Site) -> Result<usize, GenerateError> {
    let destination = site.destination();
    if !destination.is_dir() {
        return Ok(0);
    }
    let config = site.config();
    let mut removed = 0;
    let walker = WalkDir::new(destination)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| {
            e.path()
                .strip_prefix(destination)
                .map(|rel| !config.keep_file(rel))
                .unwrap_or(true)
        });
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            if fs::read_dir(entry.path())?.next().is_none() {
                fs::remove_dir(entry.path())?;
            }
        } else {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

// ============================================================================
// Tests
// ============================================================================
