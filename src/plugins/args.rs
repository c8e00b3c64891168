//! Tag argument lines.
//!
//! `{% avatar osteele size=40 %}` reaches the tag as the line
//! `osteele size=40`. Words are split on whitespace outside quotes:
//!
//! - a bare or quoted word is a positional literal
//! - `key=value` is an option; a quoted or numeric value is a literal, any
//!   other value names a variable resolved against the render bindings
//!   (`page.author` walks into objects)

use super::PluginError;
use crate::types::VariableMap;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagArgs {
    pub positional: Vec<String>,
    options: Vec<(String, ArgValue)>,
}

impl TagArgs {
    pub fn parse(tag: &str, line: &str) -> Result<Self, PluginError> {
        let mut args = TagArgs::default();
        for word in split_words(line).map_err(|message| PluginError::Tag {
            tag: tag.to_string(),
            message,
        })? {
            match word.split_once('=') {
                Some((key, value)) if is_identifier(key) => {
                    args.options.push((key.to_string(), classify(value)));
                }
                _ => args.positional.push(unquote(&word).to_string()),
            }
        }
        Ok(args)
    }

    pub fn option(&self, name: &str) -> Option<&ArgValue> {
        self.options
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// The value of option `name`, with variables looked up in `bindings`.
    pub fn resolve(&self, name: &str, bindings: &VariableMap) -> Option<Value> {
        match self.option(name)? {
            ArgValue::Literal(s) => Some(Value::String(s.clone())),
            ArgValue::Variable(path) => lookup(bindings, path).cloned(),
        }
    }

    /// Like [`resolve`](Self::resolve), rendered as text.
    pub fn resolve_string(&self, name: &str, bindings: &VariableMap) -> Option<String> {
        match self.resolve(name, bindings)? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Walk a dotted variable path through `bindings`.
pub fn lookup<'a>(bindings: &'a VariableMap, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut value = bindings.get(segments.next()?)?;
    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if quote.is_some() {
        return Err(format!("unterminated quote in {line:?}"));
    }
    if !current.is_empty() {
        words.push(current);
    }
    Ok(words)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn classify(value: &str) -> ArgValue {
    let unquoted = unquote(value);
    if unquoted.len() != value.len() || value.parse::<f64>().is_ok() || value.is_empty() {
        ArgValue::Literal(unquoted.to_string())
    } else {
        ArgValue::Variable(value.to_string())
    }
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}
