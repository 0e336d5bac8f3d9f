//! Content-addressed short links for generated memes
//!
//! A tag is a deterministic content address of the destination path, so
//! re-shortening the same path is idempotent and duplicates never pile up
//! in the cache. Entries are ephemeral: evicted by age or by capacity,
//! never persisted.
//!
//! Validation is a single allow-list predicate applied to the decoded path:
//! every rule must hold, the first failing rule names the rejection. The
//! blacklist defends against header/URL injection; the prefix rule keeps
//! redirects inside the rendering service's own image namespace so a short
//! link can never become an open redirect.

use std::time::Duration;

use crate::cache::BoundedCache;
use crate::content_address::derive_tag;
use crate::errors::ValidationError;
use crate::models::ShortLink;

/// Only paths inside the front end's proxy namespace for rendered images
/// may be shortened.
pub const ALLOWED_PREFIX: &str = "/api/images/";

/// Characters that may not appear anywhere in a destination path.
const FORBIDDEN_CHARS: &[char] = &[
    ' ', '\n', '\r', '\t', '&', '%', '#', '\\', '<', '>', '\'', '"', '+', '{', '}', '(', ')', '[',
    ']', ':',
];

/// Validate a decoded destination path.
///
/// Pure predicate, usable in isolation from HTTP. Checked against the
/// decoded form, so a double-encoded `%252e%252e` that decodes to `..`
/// is still caught.
pub fn validate_path(path: &str) -> Result<(), ValidationError> {
    if let Some(c) = path.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(ValidationError::ForbiddenCharacter(c));
    }
    if path.contains("..") || path.contains("//") {
        return Err(ValidationError::PathTraversal);
    }
    if !path.starts_with(ALLOWED_PREFIX) {
        return Err(ValidationError::PrefixNotAllowed);
    }
    Ok(())
}

pub struct ShortLinkStore {
    links: BoundedCache<String, String>,
}

impl ShortLinkStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            links: BoundedCache::new_ttl(capacity, ttl),
        }
    }

    /// Shorten a caller-supplied, percent-encoded destination path.
    ///
    /// Identical paths always yield the identical tag, so repeated calls
    /// are overwrite-safe and deduplicate naturally.
    pub fn shorten(&self, encoded_path: &str) -> Result<ShortLink, ValidationError> {
        let decoded = urlencoding::decode(encoded_path)
            .map_err(|_| ValidationError::MalformedEncoding)?
            .into_owned();
        validate_path(&decoded)?;

        let tag = derive_tag(decoded.as_bytes());
        self.links.put(tag.clone(), decoded.clone());
        Ok(ShortLink { path: decoded, tag })
    }

    /// Resolve a tag back to its destination path.
    ///
    /// Expired tags and tags that never existed are indistinguishable: both
    /// are a plain miss.
    pub fn resolve(&self, tag: &str) -> Option<String> {
        self.links.get(&tag.to_string())
    }
}
