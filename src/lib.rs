//! configmerge: layered configuration merging
//!
//! Loads configuration documents from JSON, YAML, TOML and properties sources,
//! deep-merges them in precedence order, resolves `${...}` references and
//! writes the result in any of the supported formats.
//!
//! ```no_run
//! use configmerge::{interpolate, merge, Loader, MergeOptions, ProcessEnv, Source};
//!
//! # fn main() -> configmerge::Result<()> {
//! let loader = Loader::new();
//! let documents = ["base.yaml", "prod.yaml"]
//!     .iter()
//!     .map(|path| loader.load(&Source::from_arg(path)).map(|loaded| loaded.document))
//!     .collect::<configmerge::Result<Vec<_>>>()?;
//! let merged = merge(documents, MergeOptions::default())?;
//! let resolved = interpolate(merged.document, &ProcessEnv)?;
//! println!("{}", configmerge::encode(&resolved, configmerge::Format::Json)?);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod document;
pub mod emit;
pub mod error;
pub mod interpolate;
pub mod load;
pub mod merge;
pub mod utils;

pub use document::{Document, Kind, Scalar};
pub use emit::{emit, encode, Destination};
pub use error::{Error, Result};
pub use interpolate::{interpolate, Environment, ProcessEnv};
pub use load::{Format, Loaded, Loader, Source};
pub use merge::{merge, merge_into, Conflict, ListStrategy, MergeOptions, MergeResult, Resolution};
