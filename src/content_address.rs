//! Content addressing for share tags
//!
//! Tags are derived deterministically from raw bytes: identical content
//! always maps to the identical tag, across processes and platforms. The
//! alphabet is URL-safe base64 without padding so tags can appear verbatim
//! in path segments.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

/// Digest bytes kept in a tag. Distinctness only, not a security boundary.
const TAG_BYTES: usize = 12;

/// Derive the content tag for a byte string.
pub fn derive_tag(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    URL_SAFE_NO_PAD.encode(&digest[..TAG_BYTES])
}

/// Encode a template id into the URL segment used by thumbnail paths.
///
/// Unlike [`derive_tag`] this is reversible: the thumbnail handler decodes
/// the segment back into the id, so the encoding is of the id itself, stable
/// per id rather than per content.
pub fn encode_id(id: &str) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}

/// Decode a thumbnail URL segment back into a template id.
pub fn decode_id(encoded: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}
