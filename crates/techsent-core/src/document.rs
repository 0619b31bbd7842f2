//! Filing document loading and text normalization.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::ConfigError;

/// A word broken across a line with a trailing hyphen, as produced by
/// layout-preserving text extraction.
static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)-[ \t]*\n[ \t]*(\w)").expect("valid regex"));

/// Normalize raw filing text.
///
/// - strips a leading byte-order mark
/// - converts `\r\n`, lone `\r` and form feeds to `\n`
/// - rejoins words hyphenated across a line break (`infra-\nstructure`)
///
/// Offsets reported by mention extraction refer to the normalized text.
#[must_use]
pub fn normalize_document(raw: &str) -> String {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let text = text
        .replace("\r\n", "\n")
        .replace(['\r', '\u{c}'], "\n");
    HYPHEN_BREAK.replace_all(&text, "$1$2").into_owned()
}

/// Read and normalize a plain-text filing.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
///
/// # Errors
///
/// Returns [`ConfigError::FileIo`] if the file cannot be read.
pub fn load_document(path: &Path) -> Result<String, ConfigError> {
    let bytes = std::fs::read(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    let document = normalize_document(&String::from_utf8_lossy(&bytes));
    tracing::debug!(
        path = %path.display(),
        bytes = document.len(),
        "document loaded"
    );
    Ok(document)
}
