//! Source loading
//!
//! Reads files, standard input and `--set` assignments into [`Document`]s.
//! The format of each source is decided by, in order: an explicit input
//! format, the file extension, the fallback format, content sniffing.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::document::{Document, Mapping, Scalar};
use crate::error::{Error, Result};
use crate::utils::decode_text;

pub mod format;
pub mod properties;

pub use format::Format;

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    File(PathBuf),
    Stdin,
    /// `path.to.key=value` given on the command line
    Assignment { path: Vec<String>, value: String },
}

impl Source {
    /// Interpret a positional argument: `-` is standard input, anything else a file.
    pub fn from_arg(arg: &str) -> Source {
        if arg == "-" {
            Source::Stdin
        } else {
            Source::File(PathBuf::from(arg))
        }
    }

    /// Parse `a.b.c=value`.
    pub fn assignment(arg: &str) -> Result<Source> {
        let Some((path, value)) = arg.split_once('=') else {
            return Err(Error::Usage(format!("--set expects PATH=VALUE, got '{arg}'")));
        };
        let path: Vec<String> = path.trim().split('.').map(str::to_string).collect();
        if path.iter().any(|segment| segment.is_empty()) {
            return Err(Error::Usage(format!("--set has an empty key segment in '{arg}'")));
        }
        Ok(Source::Assignment { path, value: value.to_string() })
    }

    pub fn name(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Stdin => "<stdin>".to_string(),
            Source::Assignment { path, .. } => format!("--set {}", path.join(".")),
        }
    }
}

/// A document together with the format it was read as.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub document: Document,
    pub format: Format,
}

#[derive(Debug, Clone, Default)]
pub struct Loader {
    input_format: Option<Format>,
    fallback_format: Option<Format>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every source to be parsed as `format`.
    pub fn with_input_format(mut self, format: Option<Format>) -> Self {
        self.input_format = format;
        self
    }

    /// Format used when the extension says nothing, before sniffing.
    pub fn with_fallback_format(mut self, format: Option<Format>) -> Self {
        self.fallback_format = format;
        self
    }

    pub fn load(&self, source: &Source) -> Result<Loaded> {
        self.load_onto(source, &Document::empty())
    }

    /// Like [`Loader::load`], but a `--set` assignment reuses the key layout of
    /// `base`: when `base` already holds the path under a dotted key such as
    /// `db.url`, the assignment targets that key instead of nesting.
    pub fn load_onto(&self, source: &Source, base: &Document) -> Result<Loaded> {
        let name = source.name();
        match source {
            Source::File(path) => {
                let bytes = read_file(path)?;
                let text = decode_text(&bytes, &name)?;
                self.parse(&text, &name, Format::from_path(path))
            }
            Source::Stdin => {
                let mut bytes = Vec::new();
                io::stdin()
                    .lock()
                    .read_to_end(&mut bytes)
                    .map_err(|source| Error::Io { source_name: name.clone(), source })?;
                let text = decode_text(&bytes, &name)?;
                self.parse(&text, &name, None)
            }
            Source::Assignment { path, value } => {
                let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                let keys = base.find_key_path(&segments).unwrap_or_else(|| path.clone());
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                let value = parse_assigned_value(value, &name)?;
                Ok(Loaded { document: Document::nested(&keys, value), format: Format::Yaml })
            }
        }
    }

    /// Parse already-decoded text. `extension_format` is what the source's
    /// file name suggests, if anything.
    pub fn parse(
        &self,
        text: &str,
        source_name: &str,
        extension_format: Option<Format>,
    ) -> Result<Loaded> {
        let explicit = self.input_format.or(extension_format).or(self.fallback_format);

        if text.trim().is_empty() {
            tracing::debug!("{source_name}: empty source, using an empty mapping");
            return Ok(Loaded {
                document: Document::empty(),
                format: explicit.unwrap_or(Format::Json),
            });
        }

        let format = match explicit {
            Some(format) => format,
            None => {
                let sniffed = Format::sniff(text)
                    .ok_or_else(|| Error::UnknownFormat(source_name.to_string()))?;
                tracing::debug!("{source_name}: sniffed format {sniffed}");
                sniffed
            }
        };

        let document = match format {
            Format::Json => parse_json(text, source_name)?,
            Format::Yaml => parse_yaml(text, source_name)?,
            Format::Toml => parse_toml(text, source_name)?,
            Format::Properties => properties::parse(text, source_name)?,
        };

        // A document that is nothing but null carries no configuration.
        let document = if document.is_null() { Document::empty() } else { document };
        tracing::debug!("{source_name}: loaded as {format}");
        Ok(Loaded { document, format })
    }
}

/// Load a single source with default format detection.
pub fn load(source: &Source) -> Result<Document> {
    Loader::new().load(source).map(|loaded| loaded.document)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        _ => Error::Io { source_name: path.display().to_string(), source },
    })
}

fn parse_json(text: &str, source_name: &str) -> Result<Document> {
    serde_json::from_str(text).map_err(|e| Error::format(source_name, Format::Json, e))
}

fn parse_yaml(text: &str, source_name: &str) -> Result<Document> {
    use serde::Deserialize;

    let mut documents = Vec::new();
    for de in serde_yaml::Deserializer::from_str(text) {
        let mut value = serde_yaml::Value::deserialize(de)
            .map_err(|e| Error::format(source_name, Format::Yaml, e))?;
        // `<<: *anchor` merge keys
        value.apply_merge().map_err(|e| Error::format(source_name, Format::Yaml, e))?;
        // Trailing `---` separators produce empty documents.
        if !value.is_null() {
            documents.push(value);
        }
    }

    match documents.len() {
        0 => Ok(Document::empty()),
        1 => from_yaml(documents.remove(0), source_name),
        n => Err(Error::format(
            source_name,
            Format::Yaml,
            format!("found {n} YAML documents in one source; split them into separate files"),
        )),
    }
}

fn from_yaml(value: serde_yaml::Value, source_name: &str) -> Result<Document> {
    use serde_yaml::Value;

    Ok(match value {
        Value::Null => Document::null(),
        Value::Bool(b) => Scalar::Bool(b).into(),
        Value::Number(n) => yaml_number(&n).into(),
        Value::String(s) => Document::string(s),
        Value::Sequence(items) => Document::Sequence(
            items.into_iter().map(|item| from_yaml(item, source_name)).collect::<Result<_>>()?,
        ),
        Value::Mapping(entries) => {
            let mut map = Mapping::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Null => "null".to_string(),
                    Value::Tagged(tagged) => match tagged.value {
                        Value::String(s) => s,
                        _ => return Err(complex_key(source_name)),
                    },
                    Value::Sequence(_) | Value::Mapping(_) => return Err(complex_key(source_name)),
                };
                map.insert(key, from_yaml(value, source_name)?);
            }
            Document::Mapping(map)
        }
        // Custom tags carry no merge meaning here; keep the tagged value.
        Value::Tagged(tagged) => from_yaml(tagged.value, source_name)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Integer(i)
    } else {
        Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn complex_key(source_name: &str) -> Error {
    Error::format(source_name, Format::Yaml, "mapping keys must be scalars")
}

fn parse_toml(text: &str, source_name: &str) -> Result<Document> {
    let table: toml::Table =
        text.parse().map_err(|e: toml::de::Error| Error::format(source_name, Format::Toml, e.message()))?;
    Ok(from_toml(toml::Value::Table(table)))
}

fn from_toml(value: toml::Value) -> Document {
    use toml::Value;

    match value {
        Value::String(s) => Document::string(s),
        Value::Integer(i) => Scalar::Integer(i).into(),
        Value::Float(f) => Scalar::Float(f).into(),
        Value::Boolean(b) => Scalar::Bool(b).into(),
        Value::Datetime(dt) => Document::string(dt.to_string()),
        Value::Array(items) => Document::Sequence(items.into_iter().map(from_toml).collect()),
        Value::Table(table) => {
            Document::Mapping(table.into_iter().map(|(k, v)| (k, from_toml(v))).collect())
        }
    }
}

/// `--set` values are read as a single YAML scalar so `8080`, `true` and
/// `null` keep their type. Anything that is not a scalar stays a string.
fn parse_assigned_value(raw: &str, source_name: &str) -> Result<Document> {
    if raw.trim().is_empty() {
        return Ok(Document::string(raw));
    }
    match serde_yaml::from_str::<serde_yaml::Value>(raw) {
        Ok(value @ (serde_yaml::Value::Null
        | serde_yaml::Value::Bool(_)
        | serde_yaml::Value::Number(_)
        | serde_yaml::Value::String(_))) => from_yaml(value, source_name),
        _ => Ok(Document::string(raw)),
    }
}
