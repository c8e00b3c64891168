//! End-to-end: read a small site, route it, write it.
//!
//! Drives the public API the way the CLI does: `Site::from_directory`,
//! `read_files`, `plugins::install`, `generate`.

use chrono::{DateTime, FixedOffset};
use sitepath::config::Flags;
use sitepath::document::ReadPolicy;
use sitepath::generate::generate;
use sitepath::plugins::{self, CapabilityRegistry};
use sitepath::site::{Site, SiteError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn now() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").unwrap()
}

fn read(root: &Path, flags: &Flags) -> Site {
    let mut site = Site::from_directory(root, flags).unwrap().with_now(now());
    site.read_files(ReadPolicy::FailFast).unwrap();
    site
}

fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(
        root,
        "_config.yml",
        "\
title: Fixture
permalink: pretty
plugins: [jekyll-gist, jekyll-unknown]
collections:
  recipes:
    output: true
defaults:
  - scope:
      path: ''
      type: recipes
    values:
      layout: recipe
",
    );
    write(root, "index.md", "---\ntitle: Home\n---\n# Home\n\n{% gist abc123 %}\n");
    write(root, "about.html", "---\npermalink: /about/\n---\n<p>About</p>");
    write(root, "css/site.css", "body {}");
    write(
        root,
        "_posts/a/b/2006-02-03-base.md",
        "---\ntitle: Base\n---\nFirst post.\n",
    );
    write(
        root,
        "_posts/2030-01-01-later.md",
        "---\n---\nNot yet.\n",
    );
    write(root, "_drafts/idea.md", "---\n---\nMaybe.\n");
    write(root, "_recipes/cake.md", "---\n---\nFlour.\n");
    tmp
}

#[test]
fn routes_every_kind_of_document() {
    let tmp = fixture();
    let site = read(tmp.path(), &Flags::default());

    assert_eq!(site.file_url("index.md"), Some("/index.html"));
    assert_eq!(site.file_url("about.html"), Some("/about/"));
    assert_eq!(site.file_url("css/site.css"), Some("/css/site.css"));
    assert_eq!(
        site.file_url("_posts/a/b/2006-02-03-base.md"),
        Some("/a/b/2006/02/03/base/")
    );
    assert_eq!(site.file_url("_recipes/cake.md"), Some("/recipes/cake.html"));

    // Future-dated posts and drafts are left out by default.
    assert!(site.file_url("_posts/2030-01-01-later.md").is_none());
    assert!(site.file_url("_drafts/idea.md").is_none());
    assert_eq!(site.registry().len(), 5);

    let cake = site.document("_recipes/cake.md").unwrap();
    assert_eq!(cake.front_matter()["layout"], "recipe");
    assert_eq!(cake.collection(), Some("recipes"));
}

#[test]
fn flags_widen_what_is_published() {
    let tmp = fixture();
    let flags = Flags {
        drafts: Some(true),
        future: Some(true),
        ..Flags::default()
    };
    let site = read(tmp.path(), &flags);

    assert_eq!(
        site.file_url("_posts/2030-01-01-later.md"),
        Some("/2030/01/01/later/")
    );
    let draft = site.document("_drafts/idea.md").unwrap();
    assert!(draft.is_draft());
    assert!(site.file_url("_drafts/idea.md").is_some());
}

#[test]
fn builds_destination_with_plugin_tags() {
    let tmp = fixture();
    let site = read(tmp.path(), &Flags::default());

    let mut registry = CapabilityRegistry::new();
    let installed = plugins::install(&site.config().plugins, &mut registry).unwrap();
    assert_eq!(installed, vec!["jekyll-gist".to_string()]);

    let summary = generate(&site, &registry.freeze()).unwrap();
    assert_eq!(summary.written.len(), 5);
    assert_eq!(summary.copied, 1);

    let dest = tmp.path().join("_site");
    let index = fs::read_to_string(dest.join("index.html")).unwrap();
    assert!(index.contains("<h1>Home</h1>"), "{index}");
    assert!(
        index.contains("https://gist.github.com/abc123.js"),
        "{index}"
    );
    assert_eq!(
        fs::read_to_string(dest.join("about/index.html")).unwrap(),
        "<p>About</p>"
    );
    assert!(dest.join("a/b/2006/02/03/base/index.html").is_file());
    assert!(dest.join("recipes/cake.html").is_file());
    assert!(dest.join("css/site.css").is_file());

    // A second build reads the same site without picking up its own output.
    let again = read(tmp.path(), &Flags::default());
    assert_eq!(again.registry().len(), 5);
}

#[test]
fn aliases_end_to_end() {
    let cases = [
        ("date", "/a/b/2006/02/03/base.html"),
        ("pretty", "/a/b/2006/02/03/base/"),
        ("ordinal", "/a/b/2006/34/base.html"),
        ("none", "/a/b/base.html"),
        ("/prefix/:title", "/prefix/base"),
    ];
    for (pattern, expected) in cases {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "_posts/2006-02-03-base.md",
            &format!("---\ncategories: [a, b]\npermalink: \"{pattern}\"\n---\n"),
        );
        let site = read(tmp.path(), &Flags::default());
        assert_eq!(
            site.file_url("_posts/2006-02-03-base.md"),
            Some(expected),
            "pattern {pattern}"
        );
    }
}

#[test]
fn path_and_output_ext_tokens() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a/b/base.html", "---\npermalink: /:path/out:output_ext\n---\n");
    write(tmp.path(), "base.md", "---\npermalink: /out:output_ext\n---\n");
    let site = read(tmp.path(), &Flags::default());
    assert_eq!(site.file_url("a/b/base.html"), Some("/a/b/base/out.html"));
    assert_eq!(site.file_url("base.md"), Some("/out.html"));
}

#[test]
fn collision_names_both_files() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "one.md", "---\npermalink: /same.html\n---\n");
    write(tmp.path(), "two.md", "---\npermalink: /same.html\n---\n");
    let mut site = Site::from_directory(tmp.path(), &Flags::default()).unwrap();
    let err = site.read_files(ReadPolicy::FailFast).unwrap_err();
    assert!(matches!(err, SiteError::Registry(_)));
    let message = err.to_string();
    assert!(message.contains("one.md"), "{message}");
    assert!(message.contains("two.md"), "{message}");
}
