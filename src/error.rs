//! Error taxonomy shared by the loader, merge engine, interpolator and emitter.

use std::path::PathBuf;
use thiserror::Error;

use crate::document::Kind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to parse {source_name} as {format}: {message}")]
    Format { source_name: String, format: String, message: String },

    #[error("cannot determine format of {0}; pass --input-format")]
    UnknownFormat(String),

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {source_name}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("type conflict at {path}: {old} replaced by {new}")]
    Conflict { path: String, old: Kind, new: Kind },

    #[error("unresolved reference '${{{reference}}}' in {path}")]
    UnresolvedReference { reference: String, path: String },

    #[error("cyclic reference: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("reference '${{{reference}}}' in {path} points at a {kind} and cannot be embedded in text")]
    NonScalarReference { reference: String, path: String, kind: Kind },

    #[error("invalid reference '${{{reference}}}' in {path}")]
    InvalidReference { reference: String, path: String },

    #[error("unclosed reference (missing '}}') in {path}")]
    UnclosedReference { path: String },

    #[error("{format} cannot represent {kind} at {path}")]
    UnsupportedType { format: String, path: String, kind: String },

    #[error("failed to write {destination}")]
    Write {
        destination: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),
}

impl Error {
    pub(crate) fn format(
        source_name: impl Into<String>,
        format: impl ToString,
        message: impl ToString,
    ) -> Self {
        Error::Format {
            source_name: source_name.into(),
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    /// True for errors caused by how the tool was invoked rather than by its inputs.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}
