//! Base64 image payload decoding.
//!
//! Uploads arrive either as bare base64 or as a full data URI
//! (`data:image/jpeg;base64,...`) depending on whether the frontend sends
//! a file read or a camera capture. Both shapes must decode to the same
//! bytes, so the prefix is stripped before decoding.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use super::PreprocessError;

/// Decoded payloads above this are rejected before any pixel work.
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024; // 25 MB

/// Smallest plausible encoded image (a minimal PNG is ~67 bytes).
pub const MIN_PAYLOAD_BYTES: usize = 64;

/// Matches a `data:image/<fmt>;base64,` prefix, case-insensitive on the
/// media type.
static DATA_URI_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^data:image/\w+;base64,").unwrap());

/// Decode a base64 image payload, stripping an optional data-URI prefix.
///
/// A prefixed and an unprefixed payload of the same underlying bytes
/// decode identically. Invalid base64 is a `Decode` error, distinct from
/// downstream geometry failures so the caller can report "bad image data"
/// vs. "processing failed".
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>, PreprocessError> {
    let stripped = DATA_URI_PREFIX.replace(payload.trim(), "");

    let bytes = STANDARD
        .decode(stripped.as_ref())
        .map_err(|e| PreprocessError::Decode(format!("base64 decode failed: {e}")))?;

    if bytes.len() < MIN_PAYLOAD_BYTES {
        return Err(PreprocessError::TooSmall);
    }
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(PreprocessError::TooLarge {
            actual: bytes.len(),
            limit: MAX_PAYLOAD_BYTES,
        });
    }

    Ok(bytes)
}

/// Wrap JPEG bytes as a `data:image/jpeg;base64,...` transport string.
pub fn to_jpeg_data_uri(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes))
}
