//! Text decoding for configuration sources.
//!
//! Configuration files are expected to be UTF-8, but editors on some
//! platforms still produce BOM-prefixed or legacy-encoded files. This module:
//! - strips a UTF-8 BOM and decodes UTF-16 LE/BE when a BOM says so
//! - takes a strict UTF-8 fast path
//! - falls back to chardetng detection for anything else
//! - rejects binary content instead of guessing

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::error::{Error, Result};

const BINARY_SAMPLE_SIZE: usize = 8192;

/// Decode raw source bytes into text.
///
/// Strategy:
/// 1. BOM markers (most reliable)
/// 2. Strict UTF-8
/// 3. Binary check on the leading sample
/// 4. chardetng guess, decoded with replacement characters
///
/// # Arguments
/// * `bytes` - Raw content of the source
/// * `source_name` - Name used in error messages
pub fn decode_text(bytes: &[u8], source_name: &str) -> Result<String> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (decoded, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if had_errors {
            tracing::debug!("{source_name}: replaced invalid {} sequences", encoding.name());
        }
        return Ok(decoded.into_owned());
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    if looks_binary(bytes) {
        return Err(Error::format(source_name, "text", "content looks binary"));
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    tracing::debug!("{source_name}: not UTF-8, decoding as {}", encoding.name());

    let (decoded, _, _) = encoding.decode(bytes);
    Ok(decoded.into_owned())
}

/// Null bytes in the leading sample are a strong binary indicator.
fn looks_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SAMPLE_SIZE)];
    sample.contains(&0)
}
