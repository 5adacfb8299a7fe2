//! In-memory document model
//!
//! Every loader produces a [`Document`] and every later stage consumes one, so
//! all consumers match on the same closed set of shapes.

use indexmap::IndexMap;
use std::fmt;

mod serde_impl;

pub type Mapping = IndexMap<String, Document>;

/// A parsed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Mapping(Mapping),
    Sequence(Vec<Document>),
    Scalar(Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Coarse classification used when deciding whether an override changed the
/// shape of a value. Integers and floats share the `Number` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Sequence => "sequence",
            Kind::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::Mapping(Mapping::new())
    }
}

impl Document {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn null() -> Self {
        Document::Scalar(Scalar::Null)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Document::Scalar(Scalar::String(value.into()))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Document::Mapping(_) => Kind::Mapping,
            Document::Sequence(_) => Kind::Sequence,
            Document::Scalar(Scalar::Null) => Kind::Null,
            Document::Scalar(Scalar::Bool(_)) => Kind::Bool,
            Document::Scalar(Scalar::Integer(_) | Scalar::Float(_)) => Kind::Number,
            Document::Scalar(Scalar::String(_)) => Kind::String,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Document::Scalar(Scalar::Null))
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Document::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Look up a dotted path such as `server.hosts.0.name`.
    ///
    /// Numeric segments index into sequences; an empty path returns `self`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Document> {
        let mut current = self;
        for segment in path {
            current = match current {
                Document::Mapping(map) => map.get(*segment)?,
                Document::Sequence(items) => items.get(segment.parse::<usize>().ok()?)?,
                Document::Scalar(_) => return None,
            };
        }
        Some(current)
    }

    /// Resolve dotted `segments` to the keys this document actually uses.
    ///
    /// Plain splitting is tried first; where that fails a mapping key may
    /// itself contain dots (`db.host` from a properties source), so longer
    /// joined prefixes are tried at each level.
    pub fn find_key_path(&self, segments: &[&str]) -> Option<Vec<String>> {
        let Some(first) = segments.first() else {
            return Some(Vec::new());
        };
        match self {
            Document::Mapping(map) => (1..=segments.len()).find_map(|take| {
                let key = segments[..take].join(".");
                let mut rest = map.get(&key)?.find_key_path(&segments[take..])?;
                rest.insert(0, key);
                Some(rest)
            }),
            Document::Sequence(items) => {
                let item = items.get(first.parse::<usize>().ok()?)?;
                let mut rest = item.find_key_path(&segments[1..])?;
                rest.insert(0, (*first).to_string());
                Some(rest)
            }
            Document::Scalar(_) => None,
        }
    }

    /// Build a document holding `value` at a dotted path, creating the
    /// intermediate mappings.
    pub fn nested(path: &[&str], value: Document) -> Document {
        path.iter().rev().fold(value, |inner, key| {
            let mut map = Mapping::new();
            map.insert((*key).to_string(), inner);
            Document::Mapping(map)
        })
    }
}

impl Scalar {
    /// Text used when a scalar is spliced into a larger string.
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => float_text(*f),
            Scalar::String(s) => s.clone(),
        }
    }
}

/// Shortest round-tripping form with a fractional part, as JSON writes it.
fn float_text(f: f64) -> String {
    match serde_json::Number::from_f64(f) {
        Some(number) => number.to_string(),
        None => f.to_string(),
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::String(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.to_text()),
        }
    }
}

/// Compact single-line rendering used in diagnostics.
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Scalar(scalar) => scalar.fmt(f),
            Document::Sequence(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
            Document::Mapping(map) => {
                f.write_str("{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<Scalar> for Document {
    fn from(scalar: Scalar) -> Self {
        Document::Scalar(scalar)
    }
}

impl From<Mapping> for Document {
    fn from(map: Mapping) -> Self {
        Document::Mapping(map)
    }
}

impl From<Vec<Document>> for Document {
    fn from(items: Vec<Document>) -> Self {
        Document::Sequence(items)
    }
}

/// Render a path of keys the way diagnostics print it.
pub fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.join(".")
    }
}
