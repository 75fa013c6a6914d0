//! Byte-encoding detection for uploaded files
//!
//! Runs a statistical detector over the raw bytes and, when the confidence is
//! too low, walks an ordered candidate chain, trial-decoding a small sample of
//! each. Detection never fails: some usable encoding name is always returned,
//! and full decoding falls back to a permissive latin-1 read.

use crate::constants::{
    DEFAULT_ENCODING, ENCODING_CONFIDENCE_THRESHOLD, ENCODING_SAMPLE_BYTES, FALLBACK_ENCODINGS,
};
use encoding_rs::Encoding;
use tracing::debug;

/// Detect the encoding of a byte buffer.
///
/// Statistical detection first; below the confidence threshold (or when the
/// detector returns nothing usable) each fallback candidate trial-decodes the
/// first ~1000 bytes and the first clean decode wins. Defaults to utf-8.
pub fn detect(bytes: &[u8]) -> String {
    let (detected, confidence, _) = chardet::detect(bytes);
    debug!(%detected, confidence = f64::from(confidence), "statistical encoding detection");

    if !detected.is_empty() && confidence >= ENCODING_CONFIDENCE_THRESHOLD {
        if Encoding::for_label(detected.as_bytes()).is_some() {
            return detected.to_lowercase();
        }
    }

    let sample = &bytes[..bytes.len().min(ENCODING_SAMPLE_BYTES)];
    for &candidate in FALLBACK_ENCODINGS {
        if let Some(encoding) = Encoding::for_label(candidate.as_bytes()) {
            if encoding
                .decode_without_bom_handling_and_without_replacement(sample)
                .is_some()
            {
                debug!(candidate, "fallback chain selected encoding");
                return candidate.to_string();
            }
        }
    }

    DEFAULT_ENCODING.to_string()
}

/// Decode a byte buffer into text using the detected encoding.
///
/// A strict decode with the detected encoding is attempted first; on failure
/// the content is re-read permissively as latin-1 (windows-1252), which maps
/// every byte and therefore cannot fail.
pub fn decode(bytes: &[u8]) -> String {
    let name = detect(bytes);
    if let Some(encoding) = Encoding::for_label(name.as_bytes()) {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return text.into_owned();
        }
        debug!(encoding = %name, "strict decode failed, falling back to latin-1");
    }
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii_detects_cleanly() {
        let name = detect(b"name,latitude,longitude\nStation A,37.7,-122.4\n");
        assert!(Encoding::for_label(name.as_bytes()).is_some());
    }

    #[test]
    fn test_utf8_content_round_trips() {
        let content = "station,temp\nS\u{00e3}o Paulo,25.5\n";
        let decoded = decode(content.as_bytes());
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_latin1_content_never_panics() {
        // 0xE9 is é in latin-1 but an invalid utf-8 continuation
        let bytes = b"station\nOrl\xe9ans\n";
        let decoded = decode(bytes);
        assert!(decoded.contains("Orl"));
        assert!(!decoded.is_empty());
    }

    #[test]
    fn test_empty_input_defaults() {
        let name = detect(b"");
        assert!(Encoding::for_label(name.as_bytes()).is_some());
    }

    #[test]
    fn test_arbitrary_bytes_always_decode() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let decoded = decode(&bytes);
        assert!(!decoded.is_empty());
    }
}
