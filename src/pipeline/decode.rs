//! Payload decoding: base64 text → bytes.
//!
//! Decoding is strict (standard alphabet, canonical padding) with one
//! allowance: ASCII whitespace is dropped first, because MIME-style encoders
//! wrap their output every 76 columns.

use crate::error::Doc2TxtError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Decode a base64 payload.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, Doc2TxtError> {
    let decoded = if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(payload)
    };

    decoded.map_err(|e| Doc2TxtError::Decode {
        reason: e.to_string(),
    })
}

/// Encode bytes the way clients are expected to send them.
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_payload() {
        assert_eq!(decode_payload("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_payload("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn canonical_text_round_trips() {
        for text in ["", "aGVsbG8=", "AAECAwQF", "/+8=", "UERGLTEuNwo="] {
            let bytes = decode_payload(text).unwrap();
            assert_eq!(encode_payload(&bytes), text);
        }
    }

    #[test]
    fn wrapped_payload_is_accepted() {
        let wrapped = "aGVs\r\nbG8g\nd29y bGQ=";
        assert_eq!(decode_payload(wrapped).unwrap(), b"hello world");
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        for bad in ["not-base64!!", "aGVsbG8", "a", "aGVsbG8=="] {
            let err = decode_payload(bad).unwrap_err();
            assert!(matches!(err, Doc2TxtError::Decode { .. }), "{bad}: {err}");
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn url_safe_alphabet_is_rejected() {
        // "-_" only exist in the URL-safe alphabet.
        assert!(decode_payload("-_8=").is_err());
    }
}
