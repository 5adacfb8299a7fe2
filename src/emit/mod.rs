//! Output of the final document
//!
//! The whole document is encoded before anything is written. File output goes
//! through a temporary file in the destination directory that is renamed over
//! the target, so readers see either the old file or the complete new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::load::Format;

mod encode;

pub use encode::encode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    pub fn name(&self) -> String {
        match self {
            Destination::Stdout => "<stdout>".to_string(),
            Destination::File(path) => path.display().to_string(),
        }
    }
}

pub fn emit(doc: &Document, format: Format, destination: &Destination) -> Result<()> {
    let text = encode(doc, format)?;
    match destination {
        Destination::Stdout => {
            let mut out = io::stdout().lock();
            out.write_all(text.as_bytes())
                .and_then(|()| out.flush())
                .map_err(|source| Error::Write { destination: destination.name(), source })
        }
        Destination::File(path) => write_atomic(path, text.as_bytes())
            .map_err(|source| Error::Write { destination: destination.name(), source }),
    }
}

/// Replace `path` with `bytes` via write-to-temp and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new().prefix(".configmerge-").suffix(".tmp").tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    // Keep the mode of the file being replaced.
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }

    tmp.persist(path).map_err(|err| err.error)?;
    tracing::debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(text: &str) -> Document {
        serde_json::from_str(text).expect("valid json")
    }

    #[test]
    fn test_emit_to_file_replaces_content() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("out.json");
        fs::write(&path, "old content that is longer than the new one").expect("write");

        emit(&doc(r#"{"a": 1}"#), Format::Json, &Destination::File(path.clone())).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_failed_encode_leaves_destination_untouched() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("out.toml");
        fs::write(&path, "keep = true\n").expect("write");

        let err = emit(&doc("[1]"), Format::Toml, &Destination::File(path.clone())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep = true\n");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("out.yaml");
        emit(&doc(r#"{"a": 1}"#), Format::Yaml, &Destination::File(path.clone())).unwrap();

        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["out.yaml"]);
    }

    #[test]
    fn test_missing_directory_is_a_write_error() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("no/such/dir/out.json");
        let err = emit(&doc("{}"), Format::Json, &Destination::File(path)).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_are_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("out.json");
        fs::write(&path, "{}").expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).expect("chmod");

        write_atomic(&path, b"{}\n").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }
}
