//! The Jekyll filter set.
//!
//! Filters take the piped value plus their own arguments:
//! `{{ site.pages | sort: "weight", false }}` calls `sort` with input
//! `site.pages` and arguments `["weight", false]`. Missing optional
//! arguments take Jekyll's defaults.

use super::{CapabilityRegistry, FilterFn, PluginError, RenderContext};
use crate::dates;
use crate::generate::markdown_to_html;
use chrono::{DateTime, FixedOffset};
use serde_json::{Number, Value};
use std::cmp::Ordering;

const FILTERS: &[(&str, FilterFn)] = &[
    // arrays
    ("array_to_sentence_string", array_to_sentence_string),
    ("filter", filter),
    ("sort", sort),
    ("where", where_filter),
    ("push", push),
    ("unshift", unshift),
    // dates
    ("date_to_rfc822", date_to_rfc822),
    ("date_to_string", date_to_string),
    ("date_to_long_string", date_to_long_string),
    ("date_to_xmlschema", date_to_xmlschema),
    // strings
    ("absolute_url", absolute_url),
    ("relative_url", relative_url),
    ("jsonify", jsonify),
    ("markdownify", markdownify),
    ("to_integer", to_integer),
    ("number_of_words", number_of_words),
    ("xml_escape", xml_escape),
];

pub fn install(registry: &mut CapabilityRegistry) -> Result<(), PluginError> {
    for (name, filter) in FILTERS {
        registry.register_filter(name, *filter)?;
    }
    Ok(())
}

fn error(filter: &str, message: impl Into<String>) -> PluginError {
    PluginError::Filter {
        filter: filter.to_string(),
        message: message.into(),
    }
}

fn items<'a>(filter: &str, input: &'a Value) -> Result<&'a [Value], PluginError> {
    match input {
        Value::Array(items) => Ok(items.as_slice()),
        Value::Null => Ok(&[]),
        other => Err(error(filter, format!("expected an array, got {other}"))),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn date(filter: &str, input: &Value, ctx: &RenderContext<'_>) -> Result<DateTime<FixedOffset>, PluginError> {
    dates::date_from_value(input, ctx.offset)
        .ok_or_else(|| error(filter, format!("not a date: {input}")))
}

// =============================================================================
// Arrays
// =============================================================================

fn array_to_sentence_string(input: &Value, args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let words: Vec<String> = items("array_to_sentence_string", input)?
        .iter()
        .map(text)
        .collect();
    let connector = args.first().map(text).unwrap_or_else(|| "and".into());
    let sentence = match words.as_slice() {
        [] => String::new(),
        [one] => one.clone(),
        [a, b] => format!("{a} {connector} {b}"),
        [init @ .., last] => format!("{}, {connector} {last}", init.join(", ")),
    };
    Ok(Value::String(sentence))
}

/// Items that have property `key`.
fn filter(input: &Value, args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let key = args
        .first()
        .map(text)
        .ok_or_else(|| error("filter", "missing property name"))?;
    Ok(Value::Array(
        items("filter", input)?
            .iter()
            .filter(|item| item.get(&key).is_some())
            .cloned()
            .collect(),
    ))
}

/// Sort by value, or by property `key`. Items without the property go
/// first unless the second argument is `false`.
fn sort(input: &Value, args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let mut out = items("sort", input)?.to_vec();
    match args.first().filter(|k| !k.is_null()).map(text) {
        None => out.sort_by(compare),
        Some(key) => {
            let nil_first = args.get(1).and_then(Value::as_bool).unwrap_or(true);
            out.sort_by(|a, b| {
                let a = a.get(&key).filter(|v| !v.is_null());
                let b = b.get(&key).filter(|v| !v.is_null());
                match (a, b) {
                    (Some(a), Some(b)) => compare(a, b),
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) if nil_first => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) if nil_first => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                }
            });
        }
    }
    Ok(Value::Array(out))
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => text(a).cmp(&text(b)),
    }
}

/// Items whose property `key` equals `value`, or that have `key` at all
/// when no value is given.
fn where_filter(input: &Value, args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let key = args
        .first()
        .map(text)
        .ok_or_else(|| error("where", "missing property name"))?;
    let wanted = args.get(1);
    Ok(Value::Array(
        items("where", input)?
            .iter()
            .filter(|item| match (item.get(&key), wanted) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(have), Some(want)) => have == want || text(have) == text(want),
            })
            .cloned()
            .collect(),
    ))
}

fn push(input: &Value, args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let mut out = items("push", input)?.to_vec();
    out.push(args.first().cloned().unwrap_or(Value::Null));
    Ok(Value::Array(out))
}

fn unshift(input: &Value, args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let mut out = vec![args.first().cloned().unwrap_or(Value::Null)];
    out.extend_from_slice(items("unshift", input)?);
    Ok(Value::Array(out))
}

// =============================================================================
// Dates
// =============================================================================

fn date_to_rfc822(input: &Value, _args: &[Value], ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    Ok(Value::String(date("date_to_rfc822", input, ctx)?.to_rfc2822()))
}

fn date_to_string(input: &Value, _args: &[Value], ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let d = date("date_to_string", input, ctx)?;
    Ok(Value::String(d.format("%d %b %Y").to_string()))
}

fn date_to_long_string(input: &Value, _args: &[Value], ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let d = date("date_to_long_string", input, ctx)?;
    Ok(Value::String(d.format("%d %B %Y").to_string()))
}

fn date_to_xmlschema(input: &Value, _args: &[Value], ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let d = date("date_to_xmlschema", input, ctx)?;
    Ok(Value::String(d.format("%Y-%m-%dT%H:%M:%S%:z").to_string()))
}

// =============================================================================
// Strings
// =============================================================================

fn relative(baseurl: &str, path: &str) -> String {
    format!(
        "{}/{}",
        baseurl.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn relative_url(input: &Value, _args: &[Value], ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    Ok(Value::String(relative(ctx.baseurl, &text(input))))
}

fn absolute_url(input: &Value, _args: &[Value], ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    Ok(Value::String(format!(
        "{}{}",
        ctx.url.trim_end_matches('/'),
        relative(ctx.baseurl, &text(input))
    )))
}

fn jsonify(input: &Value, _args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    serde_json::to_string(input)
        .map(Value::String)
        .map_err(|e| error("jsonify", e.to_string()))
}

fn markdownify(input: &Value, _args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    Ok(Value::String(markdown_to_html(&text(input))))
}

fn to_integer(input: &Value, _args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let n = match input {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or_default(),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| error("to_integer", format!("not an integer: {s:?}")))?,
        other => return Err(error("to_integer", format!("not an integer: {other}"))),
    };
    Ok(Value::Number(Number::from(n)))
}

fn number_of_words(input: &Value, _args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    let count = text(input)
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .count();
    Ok(Value::Number(Number::from(count)))
}

fn xml_escape(input: &Value, _args: &[Value], _ctx: &RenderContext<'_>) -> Result<Value, PluginError> {
    Ok(Value::String(
        html_escape::encode_text(&text(input)).into_owned(),
    ))
}
