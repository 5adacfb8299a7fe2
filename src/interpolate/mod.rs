//! Variable interpolation
//!
//! Strings may embed `${name}` references. Unqualified names are looked up in
//! the merged document first (as a dotted path) and then in the environment;
//! `${env:NAME}` and `${self:a.b}` pin the namespace, and `${name:-text}`
//! supplies a default. Each string is scanned into segments and the segments
//! are resolved left to right.
//!
//! Document references are resolved recursively against the final values of
//! their targets. The chain of paths currently being resolved is tracked, and
//! reaching a path already on the chain is a cycle.

use std::collections::HashMap;

use crate::document::{display_path, Document, Mapping, Scalar};
use crate::error::{Error, Result};

pub mod scan;

use scan::{Namespace, Reference, ScanError, Segment};

/// Read-only view of environment variables.
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Resolve every reference in `doc`.
///
/// A document without any `${` is returned unchanged, so running this twice
/// on its own output is a no-op.
pub fn interpolate(doc: Document, env: &dyn Environment) -> Result<Document> {
    if !contains_references(&doc) {
        return Ok(doc);
    }
    let mut resolver = Resolver { root: &doc, env, strings: HashMap::new(), chain: Vec::new() };
    resolver.resolve_path(&[])
}

fn contains_references(doc: &Document) -> bool {
    match doc {
        Document::Mapping(map) => map.values().any(contains_references),
        Document::Sequence(items) => items.iter().any(contains_references),
        Document::Scalar(Scalar::String(s)) => scan::has_reference_syntax(s),
        Document::Scalar(_) => false,
    }
}

struct Resolver<'a> {
    root: &'a Document,
    env: &'a dyn Environment,
    /// Resolved strings by path, so shared targets are expanded once.
    strings: HashMap<Vec<String>, Document>,
    /// Paths under resolution, outermost first.
    chain: Vec<Vec<String>>,
}

impl<'a> Resolver<'a> {
    fn resolve_path(&mut self, path: &[String]) -> Result<Document> {
        if let Some(done) = self.strings.get(path) {
            return Ok(done.clone());
        }
        if let Some(start) = self.chain.iter().position(|p| p == path) {
            let mut chain: Vec<String> =
                self.chain[start..].iter().map(|p| display_path(p)).collect();
            chain.push(display_path(path));
            return Err(Error::CyclicReference { chain });
        }

        let root = self.root;
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        let Some(node) = root.get_path(&segments) else {
            return Err(Error::UnresolvedReference {
                reference: path.join("."),
                path: display_path(path),
            });
        };

        self.chain.push(path.to_vec());
        let resolved = self.resolve_node(path, node);
        self.chain.pop();
        resolved
    }

    fn resolve_node(&mut self, path: &[String], node: &'a Document) -> Result<Document> {
        match node {
            Document::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                let mut child = path.to_vec();
                for key in map.keys() {
                    child.push(key.clone());
                    out.insert(key.clone(), self.resolve_path(&child)?);
                    child.pop();
                }
                Ok(Document::Mapping(out))
            }
            Document::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                let mut child = path.to_vec();
                for idx in 0..items.len() {
                    child.push(idx.to_string());
                    out.push(self.resolve_path(&child)?);
                    child.pop();
                }
                Ok(Document::Sequence(out))
            }
            Document::Scalar(Scalar::String(text)) => {
                let value = self.resolve_string(path, text)?;
                self.strings.insert(path.to_vec(), value.clone());
                Ok(value)
            }
            Document::Scalar(scalar) => Ok(Document::Scalar(scalar.clone())),
        }
    }

    fn resolve_string(&mut self, path: &[String], text: &str) -> Result<Document> {
        if !scan::has_reference_syntax(text) {
            return Ok(Document::string(text));
        }

        let segments = scan::scan(text).map_err(|err| match err {
            ScanError::Unclosed => Error::UnclosedReference { path: display_path(path) },
            ScanError::Invalid(reference) => {
                Error::InvalidReference { reference, path: display_path(path) }
            }
        })?;

        // A lone reference keeps the type of what it points at.
        if let [Segment::Reference(reference)] = segments.as_slice() {
            return self.lookup(reference, path);
        }

        let mut out = String::with_capacity(text.len());
        for segment in &segments {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Reference(reference) => match self.lookup(reference, path)? {
                    Document::Scalar(scalar) => out.push_str(&scalar.to_text()),
                    other => {
                        return Err(Error::NonScalarReference {
                            reference: reference.raw.clone(),
                            path: display_path(path),
                            kind: other.kind(),
                        })
                    }
                },
            }
        }
        Ok(Document::string(out))
    }

    fn lookup(&mut self, reference: &Reference, at: &[String]) -> Result<Document> {
        let found = match reference.namespace {
            Namespace::Document => self.lookup_document(&reference.name, None)?,
            Namespace::Env => self.env.var(&reference.name).map(Document::string),
            // A key referring to itself by name (`PATH: ${PATH}`) reads the environment.
            Namespace::Any => match self.lookup_document(&reference.name, Some(at))? {
                Some(value) => Some(value),
                None => self.env.var(&reference.name).map(Document::string),
            },
        };

        found
            .or_else(|| reference.default.clone().map(Document::string))
            .ok_or_else(|| Error::UnresolvedReference {
                reference: reference.raw.clone(),
                path: display_path(at),
            })
    }

    /// Resolve `name` as a document path. Keys containing dots are matched too.
    fn lookup_document(
        &mut self,
        name: &str,
        skip: Option<&[String]>,
    ) -> Result<Option<Document>> {
        let segments: Vec<&str> = name.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Ok(None);
        }
        match self.root.find_key_path(&segments) {
            Some(path) if skip != Some(path.as_slice()) => self.resolve_path(&path).map(Some),
            _ => Ok(None),
        }
    }
}
