//! CLI output formatting.
//!
//! # Information-First Display
//!
//! The primary display for every document is its identity, the URL it is
//! published at, with the source path shown as secondary context via an
//! indented `Source:` line. This makes the output readable as a route
//! inventory while still letting users trace each URL back to a file.
//!
//! # Output Format
//!
//! ## Routes
//!
//! ```text
//! Pages
//! 001 /about.html
//!     Source: about.md
//! 002 /css/site.css (static)
//!     Source: css/site.css
//!
//! posts (1 document)
//! 001 /2006/02/03/base.html
//!     Source: _posts/2006-02-03-base.md
//!     Date: 2006-02-03 (filename)
//!
//! notes (1 document, not published)
//! 001 _notes/todo.md
//!
//! Read 3 documents, 1 static file, 0 unpublished, 0 invalid → 3 URLs
//! ```
//!
//! ## Generate
//!
//! ```text
//! /about.html → about.html
//! /2006/02/03/base.html → 2006/02/03/base.html
//!
//! Generated 2 files (0 copied), removed 0 stale files
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::collection::{Collection, Container};
use crate::dates::DateSource;
use crate::document::Document;
use crate::generate::GenerateSummary;
use crate::plugins::Capabilities;
use crate::site::{ReadStats, Site};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// A document's header line and context lines.
fn document_lines(index: usize, doc: &Document, routed: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if routed {
        let marker = if doc.is_static() { " (static)" } else { "" };
        lines.push(format!("{} {}{}", format_index(index), doc.permalink(), marker));
        lines.push(format!("{}Source: {}", indent(1), doc.rel_path()));
    } else {
        lines.push(format!("{} {}", format_index(index), doc.rel_path()));
    }
    if doc.date_source().is_explicit() {
        let source = match doc.date_source() {
            DateSource::FrontMatter => "front matter",
            DateSource::Filename => "filename",
            DateSource::ModTime => "mtime",
        };
        lines.push(format!(
            "{}Date: {} ({})",
            indent(1),
            doc.date().format("%Y-%m-%d"),
            source
        ));
    }
    if doc.is_draft() {
        lines.push(format!("{}Draft", indent(1)));
    }
    lines
}

fn collection_header(collection: &Collection) -> String {
    let count = plural(collection.documents().len(), "document");
    if collection.is_output_enabled() {
        format!("{} ({})", collection.name(), count)
    } else {
        format!("{} ({}, not published)", collection.name(), count)
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Format the routes of a read site, grouped by container.
pub fn format_routes_output(site: &Site, stats: &ReadStats) -> Vec<String> {
    let mut lines = Vec::new();

    if !site.pages().is_empty() {
        lines.push("Pages".to_string());
        for (i, doc) in site.pages().iter().enumerate() {
            lines.extend(document_lines(i + 1, doc, true));
        }
    }

    for collection in site.collections() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(collection_header(collection));
        let routed = collection.is_output_enabled();
        for (i, doc) in collection.documents().iter().enumerate() {
            lines.extend(document_lines(i + 1, doc, routed));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format_read_summary(stats, site.registry().len()));
    lines
}

/// One-line summary of a read pass.
pub fn format_read_summary(stats: &ReadStats, urls: usize) -> String {
    format!(
        "Read {}, {}, {} unpublished, {} invalid → {}",
        plural(stats.documents, "document"),
        plural(stats.static_files, "static file"),
        stats.unpublished,
        stats.invalid,
        plural(urls, "URL")
    )
}

pub fn print_routes_output(site: &Site, stats: &ReadStats) {
    for line in format_routes_output(site, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the installed plugins and capabilities.
pub fn format_capabilities(installed: &[String], capabilities: &Capabilities) -> Vec<String> {
    let mut lines = vec!["Plugins".to_string()];
    if installed.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for name in installed {
        lines.push(format!("{}{}", indent(1), name));
    }
    let tags: Vec<&str> = capabilities.tag_names().collect();
    if !tags.is_empty() {
        lines.push(format!("{}Tags: {}", indent(1), tags.join(", ")));
    }
    lines.push(format!(
        "{}Filters: {}",
        indent(1),
        capabilities.filter_names().count()
    ));
    lines
}

pub fn print_capabilities(installed: &[String], capabilities: &Capabilities) {
    for line in format_capabilities(installed, capabilities) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate
// ============================================================================

/// Format the files a generate pass wrote.
pub fn format_generate_output(summary: &GenerateSummary) -> Vec<String> {
    let mut lines: Vec<String> = summary
        .written
        .iter()
        .map(|(url, path)| format!("{} → {}", url, path))
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Generated {} ({} copied), removed {}",
        plural(summary.written.len(), "file"),
        summary.copied,
        plural(summary.removed, "stale file")
    ));
    lines
}

pub fn print_generate_output(summary: &GenerateSummary) {
    for line in format_generate_output(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
