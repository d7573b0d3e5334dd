//! Input encoding labels and transcoding.
//!
//! Documents remember the input and output encoding labels they were
//! created with. Input bytes are transcoded to UTF-8 with `encoding_rs`
//! before parsing. A Byte Order Mark takes precedence over the label, as in
//! XML 1.0 Appendix F; otherwise the caller's label is used, falling back to
//! [`DEFAULT_ENCODING`] when it is empty.

use encoding_rs::Encoding;
use thiserror::Error;

/// The encoding assumed when the caller supplies none (libxml2's default).
pub const DEFAULT_ENCODING: &str = "utf-8";

/// An error raised while resolving a label or transcoding input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// `encoding_rs` does not know the label.
    #[error("unsupported encoding: {0}")]
    UnknownLabel(String),
}

/// Input transcoded to UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded text, BOM removed.
    pub text: String,
    /// Name of the encoding actually used.
    pub encoding: &'static str,
    /// Whether malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Returns `label`, or [`DEFAULT_ENCODING`] if it is empty.
#[must_use]
pub fn label_or_default(label: &str) -> &str {
    if label.trim().is_empty() {
        DEFAULT_ENCODING
    } else {
        label
    }
}

/// Resolves an encoding label (case-insensitive, WHATWG aliases accepted).
///
/// # Errors
///
/// Returns [`EncodingError::UnknownLabel`] if the label is not recognized.
pub fn resolve(label: &str) -> Result<&'static Encoding, EncodingError> {
    let label = label_or_default(label);
    Encoding::for_label(label.as_bytes()).ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
}

/// Transcodes `bytes` to UTF-8.
///
/// # Errors
///
/// Returns [`EncodingError::UnknownLabel`] if there is no BOM and the label
/// is not recognized. Malformed byte sequences are not an error here; they
/// are reported through [`Decoded::had_errors`] so the caller can apply its
/// recovery policy.
///
/// # Examples
///
/// ```
/// use xmlsteward::encoding::decode_input;
///
/// let decoded = decode_input(b"\xEF\xBB\xBF<a/>", "").unwrap();
/// assert_eq!(decoded.text, "<a/>");
/// assert_eq!(decoded.encoding, "UTF-8");
/// ```
pub fn decode_input(bytes: &[u8], label: &str) -> Result<Decoded, EncodingError> {
    let (encoding, skip) = match Encoding::for_bom(bytes) {
        Some(found) => found,
        None => (resolve(label)?, 0),
    };
    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[skip..]);
    Ok(Decoded {
        text: text.into_owned(),
        encoding: encoding.name(),
        had_errors,
    })
}
