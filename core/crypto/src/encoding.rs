//! Base64 helpers.
//!
//! Everything that ends up in a URL path segment uses the URL-safe alphabet
//! without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use debridgate_common::{Error, Result};

/// Encode bytes as URL-safe base64.
pub fn base64_encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode URL-safe base64.
pub fn base64_decode(encoded: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| Error::InvalidInput(format!("Invalid base64: {}", e)))
}

/// Decode URL-safe base64 that must hold UTF-8 text.
pub fn base64_decode_string(encoded: &str) -> Result<String> {
    let bytes = base64_decode(encoded)?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidInput(format!("Invalid UTF-8: {}", e)))
}
