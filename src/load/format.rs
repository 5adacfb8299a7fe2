//! Format selection: explicit flag, file extension, then content sniffing.

use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;

/// Serialization formats understood by both the loader and the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
    Toml,
    /// Java-style `key=value` properties
    Properties,
}

/// `key = value` or `key: value`, with the key not starting a comment. Bare
/// whitespace separators are not accepted while sniffing so prose never matches.
static PROPERTY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[^\s#!=:][^=:]*[=:]").expect("valid regex"));

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Properties => "properties",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "yml" | "yaml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            "properties" | "props" => Some(Format::Properties),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Format> {
        path.extension().and_then(|e| e.to_str()).and_then(Format::from_extension)
    }

    /// Guess the format from content alone.
    ///
    /// Order matters: JSON is a subset of YAML and many one-line TOML files are
    /// also valid properties, so the stricter grammars are tried first.
    pub fn sniff(text: &str) -> Option<Format> {
        let trimmed = text.trim_start();
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok()
        {
            return Some(Format::Json);
        }

        if text.parse::<toml::Table>().is_ok() {
            return Some(Format::Toml);
        }

        if matches!(
            serde_yaml::from_str::<serde_yaml::Value>(text),
            Ok(serde_yaml::Value::Mapping(_) | serde_yaml::Value::Sequence(_))
        ) {
            return Some(Format::Yaml);
        }

        if looks_like_properties(text) {
            return Some(Format::Properties);
        }

        None
    }
}

fn looks_like_properties(text: &str) -> bool {
    let mut seen = false;
    for line in text.lines() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        if !PROPERTY_LINE.is_match(line) {
            return false;
        }
        seen = true;
    }
    seen
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping_is_case_insensitive() {
        assert_eq!(Format::from_path(Path::new("a/b.JSON")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("app.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("app.Yaml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("Cargo.toml")), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("app.properties")), Some(Format::Properties));
        assert_eq!(Format::from_path(Path::new("app.conf")), None);
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_sniff_json() {
        assert_eq!(Format::sniff("  {\"a\": [1, 2]}"), Some(Format::Json));
        assert_eq!(Format::sniff("[1, 2]"), Some(Format::Json));
    }

    #[test]
    fn test_sniff_toml_before_yaml() {
        assert_eq!(Format::sniff("[server]\nport = 8080\n"), Some(Format::Toml));
        assert_eq!(Format::sniff("port = 8080\n"), Some(Format::Toml));
    }

    #[test]
    fn test_sniff_yaml() {
        assert_eq!(Format::sniff("server:\n  port: 8080\n"), Some(Format::Yaml));
        assert_eq!(Format::sniff("- a\n- b\n"), Some(Format::Yaml));
    }

    #[test]
    fn test_sniff_properties() {
        assert_eq!(
            Format::sniff("# comment\nname=John Smith\npath=/usr/local\n"),
            Some(Format::Properties)
        );
    }

    #[test]
    fn test_sniff_failure() {
        assert_eq!(Format::sniff("just some words"), None);
        assert_eq!(Format::sniff("{ not json"), None);
    }
}
