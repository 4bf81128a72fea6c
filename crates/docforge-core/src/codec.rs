//! Base64 transport encoding for request and response payloads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Decode a standard base64 string.
///
/// ASCII whitespace is ignored so that line-wrapped MIME output is accepted.
/// Any other character outside the alphabet, or bad padding, is an error.
pub fn decode(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::Decoding(format!("invalid base64: {e}")))
}

/// Decode a request payload, which must carry at least one byte.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let bytes = decode(payload)?;
    if bytes.is_empty() {
        return Err(Error::Decoding("payload is empty".to_string()));
    }
    Ok(bytes)
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
