//! Text forms of a serialized buffer, for embedding it in other documents.

use base64::Engine;

/// Encode bytes as padded base64 with the standard alphabet.
pub fn to_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Encode bytes as a `data:` URL with the given media type, e.g. `image/jpeg`.
pub fn to_data_url(data: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", to_base64(data))
}
