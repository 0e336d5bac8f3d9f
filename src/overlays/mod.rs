//! Content-addressed overlay blob store
//!
//! Overlays are small reusable images users paste onto memes. The key is a
//! content hash of the raw bytes, so uploading the same image twice returns
//! the same tag without storing it twice. Bounded by capacity, oldest-unused
//! evicted first; intentionally lost on restart.

use crate::cache::BoundedCache;
use crate::content_address::derive_tag;
use crate::errors::ValidationError;
use crate::models::OverlayBlob;
use crate::utils;

pub struct OverlayStore {
    blobs: BoundedCache<String, OverlayBlob>,
}

impl OverlayStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            blobs: BoundedCache::new_lru(capacity),
        }
    }

    /// Store an overlay image and return its content tag.
    ///
    /// Already-cached content short-circuits before mime validation: the
    /// bytes were validated when first stored, and the probe does not count
    /// as an access.
    pub fn store(&self, bytes: Vec<u8>) -> Result<String, ValidationError> {
        let tag = derive_tag(&bytes);
        if self.blobs.contains(&tag) {
            return Ok(tag);
        }

        let format = utils::detect_image_format(&bytes).ok_or(ValidationError::ImageContent)?;
        self.blobs.put(
            tag.clone(),
            OverlayBlob {
                content: bytes,
                mime_type: utils::format_mime(format).to_string(),
            },
        );
        Ok(tag)
    }

    pub fn fetch(&self, tag: &str) -> Option<OverlayBlob> {
        self.blobs.get(&tag.to_string())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x01, 0x02, 0x03,
    ];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x04, 0x05];

    #[test]
    fn store_and_fetch_round_trip() {
        let store = OverlayStore::new(8);
        let tag = store.store(PNG.to_vec()).unwrap();
        let blob = store.fetch(&tag).unwrap();
        assert_eq!(blob.content, PNG);
        assert_eq!(blob.mime_type, "image/png");
    }

    #[test]
    fn identical_bytes_deduplicate() {
        let store = OverlayStore::new(8);
        let first = store.store(PNG.to_vec()).unwrap();
        let second = store.store(PNG.to_vec()).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn dedup_does_not_count_against_capacity() {
        let store = OverlayStore::new(2);
        let png_tag = store.store(PNG.to_vec()).unwrap();
        store.store(JPEG.to_vec()).unwrap();
        // Re-storing the PNG is a no-op, so a third distinct blob is what
        // finally evicts something.
        store.store(PNG.to_vec()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.fetch(&png_tag).is_some());
    }

    #[test]
    fn rejects_non_image_content() {
        let store = OverlayStore::new(8);
        assert_eq!(
            store.store(b"<html>not an image</html>".to_vec()),
            Err(ValidationError::ImageContent)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_tag_is_a_miss() {
        let store = OverlayStore::new(8);
        assert!(store.fetch("missing").is_none());
    }

    #[test]
    fn mime_follows_content_not_name() {
        let store = OverlayStore::new(8);
        let tag = store.store(JPEG.to_vec()).unwrap();
        assert_eq!(store.fetch(&tag).unwrap().mime_type, "image/jpeg");
    }
}
