//! # Sitepath
//!
//! Document identity and URL assignment for Jekyll-style static sites.
//! Every source file gets exactly one set of properties and at most one
//! URL, and no two files are allowed to claim the same URL.
//!
//! # Architecture: Read, Route, Write
//!
//! ```text
//! 1. Read      source/    →  documents      (front matter + cascade + date)
//! 2. Route     documents  →  PathRegistry   (permalink compile + collision check)
//! 3. Write     registry   →  _site/         (optional; markdown + plugin tags)
//! ```
//!
//! Reading is parallel across files (rayon); routing is a single sorted merge,
//! so the outcome of a pass never depends on scheduling. The write stage is a
//! thin consumer of the registry and exists so that the CLI can produce an
//! inspectable tree; it does not apply layouts.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `_config.yml` / `_config.toml` loading over stock defaults, build flags |
//! | [`frontmatter`] | Splitting a file into its YAML front matter block and body |
//! | [`cascade`] | Resolving `defaults` + collection metadata + front matter into one map |
//! | [`dates`] | Effective document dates and offsets |
//! | [`naming`] | `YYYY-MM-DD-slug` post filenames, slugs, extensions |
//! | [`permalink`] | Pattern aliases, template variables, URL compilation |
//! | [`document`] | A single source file's identity: properties, date, URL, eligibility |
//! | [`collection`] | The [`Container`](collection::Container) trait, the site root, named collections |
//! | [`registry`] | URL ↔ source path map with collision detection |
//! | [`site`] | The read pass that ties the above together |
//! | [`plugins`] | Capability registry for tags and filters, built-in plugins |
//! | [`generate`] | Writing routed documents under the destination |
//! | [`types`] | Variable maps shared by front matter, defaults, and templates |
//! | [`output`] | CLI output formatting: route tables and summaries |
//!
//! # Design Decisions
//!
//! ## No Global Site
//!
//! A [`site::Site`] is an ordinary value built once per read pass and passed
//! by reference. Documents refer to their container through the
//! [`Container`](collection::Container) trait rather than a back pointer, so
//! a document can be read and tested without a site around it.
//!
//! ## Collisions Are Errors
//!
//! Two files producing the same URL would silently overwrite each other in
//! the output. [`registry::PathRegistry::insert`] refuses instead and names
//! both files. A failed pass leaves the previous registry untouched.
//!
//! ## Explicit Plugin Installation
//!
//! Plugins register their tags and filters into a
//! [`plugins::CapabilityRegistry`] through an explicit
//! [`plugins::install`] call. Registering a name twice is an error; the
//! frozen [`plugins::Capabilities`] are read-only afterwards.

pub mod cascade;
pub mod collection;
pub mod config;
pub mod dates;
pub mod document;
pub mod frontmatter;
pub mod generate;
pub mod naming;
pub mod output;
pub mod permalink;
pub mod plugins;
pub mod registry;
pub mod site;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
