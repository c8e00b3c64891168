//! Shared test utilities for the sitepath test suite.
//!
//! Provides fixture writers and lookup helpers that panic with the list of
//! available keys on a miss, so a failing assertion says what *was* there.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "_posts/2006-02-03-base.md", "---\n---\n");
//! let site = read_site(tmp.path());
//!
//! assert_eq!(url_of(&site, "_posts/2006-02-03-base.md"), "/2006/02/03/base.html");
//! ```

use std::fs;
use std::path::Path;

use chrono::{Offset, Utc};
use serde_json::Value;

use crate::config::{Flags, SiteConfig};
use crate::document::{Document, ReadContext, ReadPolicy};
use crate::site::Site;
use crate::types::VariableMap;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A JSON object literal as a variable map. Panics on other values.
pub fn map(value: Value) -> VariableMap {
    match value {
        Value::Object(m) => m,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// A fail-fast read context over `source`, in UTC, at the current time.
pub fn context_for<'a>(config: &'a SiteConfig, source: &'a Path) -> ReadContext<'a> {
    let offset = Utc.fix();
    ReadContext {
        config,
        source,
        now: Utc::now().with_timezone(&offset),
        offset,
        policy: ReadPolicy::FailFast,
    }
}

/// Load and read the site at `root` with default flags. Panics on error.
pub fn read_site(root: &Path) -> Site {
    let mut site = Site::from_directory(root, &Flags::default())
        .unwrap_or_else(|e| panic!("failed to load site: {e}"));
    site.read_files(ReadPolicy::FailFast)
        .unwrap_or_else(|e| panic!("failed to read site: {e}"));
    site
}

// =========================================================================
// Site lookups: panic with a clear message on miss
// =========================================================================

/// Find an eligible document by source path. Panics if not found.
pub fn find_document<'a>(site: &'a Site, rel_path: &str) -> &'a Document {
    site.document(rel_path).unwrap_or_else(|| {
        let paths: Vec<&str> = site.documents().map(|d| d.rel_path()).collect();
        panic!("document '{rel_path}' not found. Available: {paths:?}")
    })
}

/// The published URL of a source path. Panics if it has none.
pub fn url_of<'a>(site: &'a Site, rel_path: &str) -> &'a str {
    site.file_url(rel_path).unwrap_or_else(|| {
        let routes: Vec<(&str, &str)> = site.registry().iter().collect();
        panic!("'{rel_path}' is not published. Routes: {routes:?}")
    })
}
