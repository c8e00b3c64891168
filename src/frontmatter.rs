//! Front matter: the YAML header at the top of a document.
//!
//! ```text
//! ---
//! title: Hello
//! categories: [a, b]
//! ---
//! Body text…
//! ```
//!
//! The opening marker must be the very first line. The block ends at a line
//! consisting of `---` or `...`. A file without an opening marker has no
//! front matter and is treated as a static file, and so is a file whose
//! opening marker is never closed (plain YAML data files start with `---`
//! too). An empty block (`---`
//! immediately followed by `---`) is an empty mapping, which still makes the
//! file a document.

use crate::types::VariableMap;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("front matter is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("front matter must be a mapping")]
    NotAMapping,
    #[error("front matter is not valid UTF-8")]
    Encoding,
}

/// A document split into its header and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Split<'a> {
    pub front_matter: VariableMap,
    pub body: &'a [u8],
}

/// True when `bytes` starts with a front matter opening line.
pub fn has_front_matter(bytes: &[u8]) -> bool {
    first_line(bytes).is_some_and(|(line, _)| trim_line(line) == b"---")
}

/// Split a file's bytes into front matter and body.
///
/// Returns `Ok(None)` when there is no front matter block (a static file),
/// including an opening marker with no closing one. The body is not required
/// to be UTF-8 in that case.
pub fn split(bytes: &[u8]) -> Result<Option<Split<'_>>, FrontMatterError> {
    let Some((_, mut pos)) = first_line(bytes).filter(|(l, _)| trim_line(l) == b"---") else {
        return Ok(None);
    };
    let header_start = pos;
    loop {
        let Some((line, next)) = first_line(&bytes[pos..]) else {
            return Ok(None);
        };
        let trimmed = trim_line(line);
        if trimmed == b"---" || trimmed == b"..." {
            let header = std::str::from_utf8(&bytes[header_start..pos])
                .map_err(|_| FrontMatterError::Encoding)?;
            return Ok(Some(Split {
                front_matter: parse(header)?,
                body: &bytes[pos + next..],
            }));
        }
        pos += next;
    }
}

/// Parse the YAML text between the markers.
pub fn parse(header: &str) -> Result<VariableMap, FrontMatterError> {
    if header.trim().is_empty() {
        return Ok(VariableMap::new());
    }
    match serde_yaml_ng::from_str::<Value>(header)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(VariableMap::new()),
        _ => Err(FrontMatterError::NotAMapping),
    }
}

/// The first line of `bytes` without its terminator, and the offset of the
/// byte after the terminator. `None` for empty input.
fn first_line(bytes: &[u8]) -> Option<(&[u8], usize)> {
    if bytes.is_empty() {
        return None;
    }
    match bytes.iter().position(|&b| b == b'\n') {
        Some(i) => Some((&bytes[..i], i + 1)),
        None => Some((bytes, bytes.len())),
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}
