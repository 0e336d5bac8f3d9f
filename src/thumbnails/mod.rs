//! Filesystem-backed thumbnail cache
//!
//! Thumbnails are derived images materialized on demand next to the
//! template they belong to, under a fixed name. A missing thumbnail only
//! means "not yet materialized"; generation is idempotent and publishes
//! through an atomic rename so a concurrent reader can never observe a
//! partial file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::codecs::jpeg::JpegEncoder;
use tokio::fs;
use tracing::debug;

use crate::errors::AppError;

/// Fixed name of the materialized thumbnail inside a template directory.
pub const THUMBNAIL_FILE: &str = "mini.jpg";

// Distinguishes scratch files of racing generators for the same template.
static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct ThumbnailCache {
    templates_dir: PathBuf,
    max_dimension: u32,
    quality: u8,
}

impl ThumbnailCache {
    pub fn new(templates_dir: PathBuf, max_dimension: u32, quality: u8) -> Self {
        Self {
            templates_dir,
            max_dimension,
            quality,
        }
    }

    /// Make sure the thumbnail for a template exists.
    ///
    /// Returns `false` without side effects when the template directory does
    /// not exist (or is incomplete); `true` when the thumbnail file is
    /// present afterwards. Generation races for the same id converge on the
    /// same bytes, so whichever rename lands last wins harmlessly.
    pub async fn ensure(&self, template_id: &str) -> Result<bool, AppError> {
        let Some(dir) = self.template_dir(template_id) else {
            return Ok(false);
        };
        if !is_complete_template(&dir).await {
            return Ok(false);
        }

        let thumb_path = dir.join(THUMBNAIL_FILE);
        if fs::try_exists(&thumb_path).await? {
            return Ok(true);
        }

        let Some(source) = find_primary_image(&dir).await? else {
            return Ok(false);
        };
        let bytes = fs::read(&source).await?;
        let encoded = self.downscale(&bytes)?;

        // Write to a scratch file in the same directory, then atomically
        // rename into place.
        let scratch = dir.join(format!(
            ".{}.{}.tmp",
            THUMBNAIL_FILE,
            SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&scratch, &encoded).await?;
        fs::rename(&scratch, &thumb_path).await?;
        debug!(
            "materialized thumbnail for {template_id} ({} bytes)",
            encoded.len()
        );
        Ok(true)
    }

    /// Thumbnail bytes for a template, materializing them first if needed.
    pub async fn fetch(&self, template_id: &str) -> Result<Option<Vec<u8>>, AppError> {
        if !self.ensure(template_id).await? {
            return Ok(None);
        }
        // ensure() returned true, so the directory resolved above.
        let dir = match self.template_dir(template_id) {
            Some(dir) => dir,
            None => return Ok(None),
        };
        Ok(Some(fs::read(dir.join(THUMBNAIL_FILE)).await?))
    }

    /// Resolve a template id to its directory, refusing ids that could
    /// escape the templates root.
    fn template_dir(&self, template_id: &str) -> Option<PathBuf> {
        if template_id.is_empty()
            || template_id.contains('/')
            || template_id.contains('\\')
            || template_id.contains("..")
        {
            return None;
        }
        Some(self.templates_dir.join(template_id))
    }

    /// Proportional clamp-shrink and lossy re-encode.
    fn downscale(&self, bytes: &[u8]) -> Result<Vec<u8>, AppError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AppError::Storage(std::io::Error::other(e)))?;

        // Never upscale: small images are re-encoded at their own size.
        let img = if img.width().max(img.height()) > self.max_dimension {
            img.thumbnail(self.max_dimension, self.max_dimension)
        } else {
            img
        };

        let rgb = img.to_rgb8();
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| AppError::Storage(std::io::Error::other(e)))?;
        Ok(out)
    }
}

/// A template directory is only real when both required files are present;
/// anything less is treated as absent, never as a broken template.
pub async fn is_complete_template(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    let has_config = fs::try_exists(dir.join("config.yml")).await.unwrap_or(false);
    has_config
        && matches!(find_primary_image(dir).await, Ok(Some(_)))
}

/// Locate `default.<ext>` inside a template directory.
async fn find_primary_image(dir: &Path) -> Result<Option<PathBuf>, AppError> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.file_stem().is_some_and(|stem| stem == "default") && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
