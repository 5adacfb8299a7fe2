//! Lexical scan of `${...}` references inside a string.

use once_cell::sync::Lazy;
use regex::Regex;

/// `[env:|self:]name[:-default]`
static REFERENCE_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:(env|self):)?([A-Za-z_][A-Za-z0-9_.\-]*)(?::-(.*))?$")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Document first, then environment
    Any,
    Env,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Text between the braces, used in messages.
    pub raw: String,
    pub namespace: Namespace,
    pub name: String,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Reference(Reference),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    Unclosed,
    Invalid(String),
}

/// Cheap pre-check used to skip strings with nothing to resolve.
pub fn has_reference_syntax(text: &str) -> bool {
    text.contains("${")
}

/// Split `text` into literal runs and references, left to right.
///
/// `$${` produces a literal `${`; a `$` not followed by `{` is literal.
pub fn scan(text: &str) -> Result<Vec<Segment>, ScanError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        literal.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(escaped) = after.strip_prefix("${") {
            literal.push_str("${");
            rest = escaped;
            continue;
        }

        let Some(body_start) = after.strip_prefix('{') else {
            literal.push('$');
            rest = after;
            continue;
        };

        let end = body_start.find('}').ok_or(ScanError::Unclosed)?;
        let body = &body_start[..end];
        let reference = parse_reference(body)?;

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Reference(reference));
        rest = &body_start[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn parse_reference(body: &str) -> Result<Reference, ScanError> {
    let caps = REFERENCE_BODY.captures(body).ok_or_else(|| ScanError::Invalid(body.to_string()))?;
    let namespace = match caps.get(1).map(|m| m.as_str()) {
        Some("env") => Namespace::Env,
        Some(_) => Namespace::Document,
        None => Namespace::Any,
    };
    Ok(Reference {
        raw: body.to_string(),
        namespace,
        name: caps[2].to_string(),
        default: caps.get(3).map(|m| m.as_str().to_string()),
    })
}
