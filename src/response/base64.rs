//! Base64 helpers for image payloads

use base64::{engine::general_purpose::STANDARD, DecodeError, Engine};

/// Encode binary data to base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Strip an optional `data:image/...;base64,` prefix and surrounding whitespace
pub fn strip_data_url(data: &str) -> &str {
    match data.split_once(',') {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload.trim(),
        _ => data.trim(),
    }
}

/// Decode base64 string (plain or data URL) to binary data
pub fn decode(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(strip_data_url(encoded))
}

/// Decode a provider image payload and re-encode it as canonical plain base64.
///
/// Returns `None` when the payload is not base64 or decodes to no bytes.
pub fn normalize(data: &str) -> Option<String> {
    let bytes = decode(data).ok()?;
    if bytes.is_empty() {
        return None;
    }
    Some(encode(&bytes))
}
