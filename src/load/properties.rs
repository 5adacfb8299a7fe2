//! Java-style `.properties` reader and writer.
//!
//! Keys stay flat: `server.port=80` yields the key `server.port`, not a nested
//! mapping. Every value loads as a string.

use crate::document::{Document, Mapping, Scalar};
use crate::error::{Error, Result};

pub fn parse(text: &str, source_name: &str) -> Result<Document> {
    let mut map = Mapping::new();
    for (line_no, line) in logical_lines(text) {
        let (key, value) = split_entry(&line);
        let key = unescape(key)
            .map_err(|msg| Error::format(source_name, "properties", format!("line {line_no}: {msg}")))?;
        let value = unescape(value)
            .map_err(|msg| Error::format(source_name, "properties", format!("line {line_no}: {msg}")))?;
        map.insert(key, Document::string(value));
    }
    Ok(Document::Mapping(map))
}

/// Join continuation lines and drop blanks and comments. Yields the 1-based
/// number of the first physical line of each entry.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_start();
        let (start, mut buf) = match pending.take() {
            Some(entry) => entry,
            None => {
                if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                    continue;
                }
                (idx + 1, String::new())
            }
        };

        if ends_with_continuation(line) {
            buf.push_str(&line[..line.len() - 1]);
            pending = Some((start, buf));
        } else {
            buf.push_str(line);
            out.push((start, buf));
        }
    }

    if let Some(entry) = pending {
        out.push(entry);
    }
    out
}

/// An odd number of trailing backslashes continues onto the next line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split on the first unescaped `=`, `:` or whitespace.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = idx;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
    }
    (key, rest)
}

fn unescape(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\u escape '\\u{hex}'"))?;
                out.push(code);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

/// Render a flat mapping of scalars. Returns the path and kind of the first
/// value properties cannot hold.
pub fn render(doc: &Document) -> std::result::Result<String, (String, String)> {
    let map = match doc {
        Document::Mapping(map) => map,
        other => return Err(("(root)".to_string(), other.kind().to_string())),
    };

    let mut out = String::new();
    for (key, value) in map {
        let text = match value {
            Document::Scalar(Scalar::Null) => return Err((key.clone(), "null".to_string())),
            Document::Scalar(scalar) => scalar.to_text(),
            Document::Mapping(_) => return Err((key.clone(), "nested mapping".to_string())),
            Document::Sequence(_) => return Err((key.clone(), "sequence".to_string())),
        };
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(&text, false));
        out.push('\n');
    }
    Ok(out)
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (idx, ch) in raw.chars().enumerate() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(ch);
            }
            ' ' if is_key || idx == 0 => out.push_str("\\ "),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(doc: &'a Document, key: &str) -> &'a str {
        doc.as_mapping().and_then(|m| m.get(key)).and_then(Document::as_str).expect(key)
    }

    #[test]
    fn test_basic_separators_and_comments() {
        let doc = parse(
            "# comment\n! also comment\nkey1=value1\nkey2 : value2\nkey3 value3\n\nserver.port=8080\n",
            "t",
        )
        .unwrap();
        assert_eq!(get(&doc, "key1"), "value1");
        assert_eq!(get(&doc, "key2"), "value2");
        assert_eq!(get(&doc, "key3"), "value3");
        assert_eq!(get(&doc, "server.port"), "8080");
        assert_eq!(doc.as_mapping().unwrap().len(), 4);
    }

    #[test]
    fn test_continuation_lines() {
        let doc = parse("fruits = apple, \\\n    banana, \\\n    pear\nnext=1\n", "t").unwrap();
        assert_eq!(get(&doc, "fruits"), "apple, banana, pear");
        assert_eq!(get(&doc, "next"), "1");
    }

    #[test]
    fn test_escapes() {
        let doc = parse("a\\=b=c\\td\nuni=caf\\u00e9\nempty=\n", "t").unwrap();
        assert_eq!(get(&doc, "a=b"), "c\td");
        assert_eq!(get(&doc, "uni"), "café");
        assert_eq!(get(&doc, "empty"), "");
    }

    #[test]
    fn test_bad_unicode_escape() {
        let err = parse("x=\\u12\n", "bad.properties").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_render_escapes_and_rejects_nesting() {
        let doc = parse("a\\ key=  leading\nplain=v\n", "t").unwrap();
        assert_eq!(render(&doc).unwrap(), "a\\ key=leading\nplain=v\n");

        let nested: Document = serde_json::from_str(r#"{"a": {"b": 1}}"#).unwrap();
        assert_eq!(render(&nested).unwrap_err(), ("a".to_string(), "nested mapping".to_string()));
    }

    #[test]
    fn test_render_then_parse_preserves_strings() {
        let doc: Document =
            serde_json::from_str(r#"{"path": "C:\\temp", "msg": " hi\nthere", "k:x": "v"}"#).unwrap();
        let text = render(&doc).unwrap();
        assert_eq!(parse(&text, "t").unwrap(), doc);
    }
}
