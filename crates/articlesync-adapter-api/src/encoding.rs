//! Path encoding for article identifiers.
//!
//! Article IDs are free-form strings (slugs, URNs, titles with spaces), so
//! they are percent-encoded as a single path segment before being placed in
//! a request URL. Only RFC 3986 unreserved characters pass through.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that must be percent-encoded in an article ID path segment.
const ARTICLE_ID_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encode an article ID as one URL path segment.
///
/// # Examples
///
/// ```
/// use articlesync_adapter_api::encode_article_id;
///
/// assert_eq!(encode_article_id("release-notes_v2"), "release-notes_v2");
/// assert_eq!(encode_article_id("drafts/launch day"), "drafts%2Flaunch%20day");
/// ```
#[must_use]
pub fn encode_article_id(id: &str) -> String {
    utf8_percent_encode(id, ARTICLE_ID_ESCAPE).to_string()
}

/// Decode a percent-encoded article ID.
///
/// # Errors
///
/// Returns error if the decoded bytes are not valid UTF-8.
///
/// # Examples
///
/// ```
/// use articlesync_adapter_api::{decode_article_id, encode_article_id};
///
/// let original = "urn:news:2024/budget";
/// let decoded = decode_article_id(&encode_article_id(original)).unwrap();
/// assert_eq!(decoded, original);
/// ```
pub fn decode_article_id(encoded: &str) -> Result<String, EncodingError> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| EncodingError::Utf8Decode(e.to_string()))
}

/// Errors that can occur during decoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EncodingError {
    /// UTF-8 decoding failed
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(String),
}
