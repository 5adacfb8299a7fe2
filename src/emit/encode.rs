//! Document → text for each output format.

use crate::document::{display_path, Document, Scalar};
use crate::error::{Error, Result};
use crate::load::{properties, Format};

/// Serialize `doc` in `format`. Mapping keys keep their merged order.
pub fn encode(doc: &Document, format: Format) -> Result<String> {
    match format {
        Format::Json => encode_json(doc),
        Format::Yaml => encode_yaml(doc),
        Format::Toml => encode_toml(doc),
        Format::Properties => properties::render(doc)
            .map_err(|(path, kind)| unsupported(Format::Properties, path, kind)),
    }
}

fn encode_json(doc: &Document) -> Result<String> {
    if let Some(path) = find(doc, &mut Vec::new(), &|value: &Document| {
        matches!(value, Document::Scalar(Scalar::Float(f)) if !f.is_finite())
    }) {
        return Err(unsupported(Format::Json, path, "non-finite float"));
    }
    let mut text = serde_json::to_string_pretty(doc)
        .map_err(|e| unsupported(Format::Json, "(root)", e.to_string()))?;
    text.push('\n');
    Ok(text)
}

fn encode_yaml(doc: &Document) -> Result<String> {
    serde_yaml::to_string(doc).map_err(|e| unsupported(Format::Yaml, "(root)", e.to_string()))
}

fn encode_toml(doc: &Document) -> Result<String> {
    let Document::Mapping(map) = doc else {
        return Err(unsupported(Format::Toml, "(root)", format!("a {} root", doc.kind())));
    };
    if let Some(path) = find(doc, &mut Vec::new(), &Document::is_null) {
        return Err(unsupported(Format::Toml, path, "null"));
    }
    let table: toml::Table = map.iter().map(|(k, v)| (k.clone(), to_toml(v))).collect();
    toml::to_string_pretty(&table).map_err(|e| unsupported(Format::Toml, "(root)", e.to_string()))
}

/// Nulls have been rejected by the caller.
fn to_toml(doc: &Document) -> toml::Value {
    match doc {
        Document::Mapping(map) => {
            toml::Value::Table(map.iter().map(|(k, v)| (k.clone(), to_toml(v))).collect())
        }
        Document::Sequence(items) => toml::Value::Array(items.iter().map(to_toml).collect()),
        Document::Scalar(Scalar::Bool(b)) => toml::Value::Boolean(*b),
        Document::Scalar(Scalar::Integer(i)) => toml::Value::Integer(*i),
        Document::Scalar(Scalar::Float(f)) => toml::Value::Float(*f),
        Document::Scalar(Scalar::String(s)) => toml::Value::String(s.clone()),
        Document::Scalar(Scalar::Null) => toml::Value::String(String::new()),
    }
}

/// Depth-first search for the first value matching `pred`; returns its path.
fn find(
    doc: &Document,
    path: &mut Vec<String>,
    pred: &dyn Fn(&Document) -> bool,
) -> Option<String> {
    if pred(doc) {
        return Some(display_path(path));
    }
    match doc {
        Document::Mapping(map) => map.iter().find_map(|(key, value)| {
            path.push(key.clone());
            let hit = find(value, path, pred);
            path.pop();
            hit
        }),
        Document::Sequence(items) => items.iter().enumerate().find_map(|(idx, value)| {
            path.push(idx.to_string());
            let hit = find(value, path, pred);
            path.pop();
            hit
        }),
        Document::Scalar(_) => None,
    }
}

fn unsupported(format: Format, path: impl Into<String>, kind: impl Into<String>) -> Error {
    Error::UnsupportedType { format: format.to_string(), path: path.into(), kind: kind.into() }
}
