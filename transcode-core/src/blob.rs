//! Shared blob <-> base64 text marshalling, used by the text-based codecs
//! (JSON, XML, form-url) for `Blob`-kind fields. CBOR carries blobs as raw
//! byte strings and has no use for this module.

#[cfg(feature = "alloc")]
use alloc::{string::String, vec::Vec};

use base64::Engine;

use crate::error::{CoreError, CoreErrorKind};

/// Standard (RFC 4648) base64 encoding, with padding.
pub fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Standard (RFC 4648) base64 decoding, with padding required.
pub fn decode(text: &str) -> Result<Vec<u8>, CoreError> {
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|_| {
            log::debug!("blob decode: invalid base64 text ({} bytes)", text.len());
            CoreError::new(CoreErrorKind::InvalidBlobEncoding)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let bytes = b"hello blob";
        let text = encode(bytes);
        assert_eq!(decode(&text).unwrap(), bytes);
    }
}
