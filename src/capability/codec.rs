//! Binary-to-text and structured-data codecs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use super::CapabilityError;

/// Base64 (standard alphabet, padded).
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Inverse of [`encode`].
///
/// # Errors
///
/// Returns [`CapabilityError::InvalidArgument`] on malformed input.
pub fn decode(text: &str) -> Result<Vec<u8>, CapabilityError> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| CapabilityError::InvalidArgument(format!("invalid base64: {e}")))
}

/// Parse a JSON document, keeping object keys in document order.
///
/// # Errors
///
/// Returns [`CapabilityError::InvalidArgument`] when the text is not JSON.
pub fn parse_structured(text: &str) -> Result<serde_json::Value, CapabilityError> {
    serde_json::from_str(text)
        .map_err(|e| CapabilityError::InvalidArgument(format!("invalid JSON: {e}")))
}

/// Serialize JSON compactly, or pretty-printed with `indent` spaces.
///
/// # Errors
///
/// Returns [`CapabilityError::InvalidArgument`] if serialization fails.
pub fn serialize_structured(
    value: &serde_json::Value,
    indent: Option<usize>,
) -> Result<String, CapabilityError> {
    let Some(width) = indent else {
        return serde_json::to_string(value)
            .map_err(|e| CapabilityError::InvalidArgument(e.to_string()));
    };
    let pad = " ".repeat(width);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(pad.as_bytes());
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| CapabilityError::InvalidArgument(e.to_string()))?;
    String::from_utf8(out).map_err(|e| CapabilityError::InvalidArgument(e.to_string()))
}
