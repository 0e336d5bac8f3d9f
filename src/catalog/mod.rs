//! Template catalog mirrored from the rendering service
//!
//! The catalog is a read-through cache over the upstream's template listing.
//! A snapshot is built lazily on first access, published atomically, and
//! kept until `invalidate` drops it after a successful upload. Rebuilds are
//! all-or-nothing: any fetch failure or malformed payload aborts the whole
//! rebuild and nothing is published.
//!
//! Concurrent cache misses coalesce on a rebuild guard so only one set of
//! upstream calls is ever in flight; readers of an already-published
//! snapshot never touch the guard and never block on upstream I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use url::Url;

use crate::content_address::encode_id;
use crate::errors::AppError;
use crate::models::TemplateMetadata;
use crate::utils::sanitize_base_url;

/// One entry of the upstream `GET /images/` listing.
#[derive(Debug, serde::Deserialize)]
struct TemplateRef {
    template: String,
}

/// Upstream template detail record.
#[derive(Debug, serde::Deserialize)]
struct TemplateDetail {
    id: String,
    #[serde(default)]
    name: String,
    blank: String,
    #[serde(default)]
    lines: u32,
    #[serde(default)]
    overlays: u32,
}

pub type CatalogSnapshot = Arc<HashMap<String, TemplateMetadata>>;

pub struct TemplateCatalog {
    client: reqwest::Client,
    upstream: String,
    snapshot: RwLock<Option<CatalogSnapshot>>,
    rebuild: Mutex<()>,
}

impl TemplateCatalog {
    pub fn new(upstream_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("meme-front/0.1")
            .build()?;

        Ok(Self {
            client,
            upstream: sanitize_base_url(upstream_url),
            snapshot: RwLock::new(None),
            rebuild: Mutex::new(()),
        })
    }

    /// Current snapshot, building one if none is published.
    pub async fn list(&self) -> Result<CatalogSnapshot, AppError> {
        if let Some(snapshot) = self.snapshot.read().await.clone() {
            return Ok(snapshot);
        }

        // Coalesce concurrent rebuilds: whoever wins the guard fetches,
        // everyone else re-checks and reuses the published result.
        let _guard = self.rebuild.lock().await;
        if let Some(snapshot) = self.snapshot.read().await.clone() {
            return Ok(snapshot);
        }

        let built = self.fetch_all().await?;
        info!("template catalog rebuilt with {} templates", built.len());
        let snapshot: CatalogSnapshot = Arc::new(built);
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Drop the published snapshot so the next `list` rebuilds.
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
        debug!("template catalog invalidated");
    }

    async fn fetch_all(&self) -> Result<HashMap<String, TemplateMetadata>, AppError> {
        let listing_url = format!("{}/images/", self.upstream);
        let refs: Vec<TemplateRef> = self
            .client
            .get(&listing_url)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("listing templates: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::upstream(format!("listing templates: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("malformed template listing: {e}")))?;

        let mut templates = HashMap::with_capacity(refs.len());
        for template_ref in refs {
            let path = url_path(&template_ref.template).ok_or_else(|| {
                AppError::upstream(format!(
                    "malformed template reference: {}",
                    template_ref.template
                ))
            })?;

            let detail_url = format!("{}{}", self.upstream, path);
            let detail: TemplateDetail = self
                .client
                .get(&detail_url)
                .send()
                .await
                .map_err(|e| AppError::upstream(format!("fetching {path}: {e}")))?
                .error_for_status()
                .map_err(|e| AppError::upstream(format!("fetching {path}: {e}")))?
                .json()
                .await
                .map_err(|e| AppError::upstream(format!("malformed detail for {path}: {e}")))?;

            let metadata = build_metadata(detail)?;
            templates.insert(metadata.id.clone(), metadata);
        }

        Ok(templates)
    }
}

/// Extract the path of an upstream-supplied URL; already-relative
/// references pass through.
fn url_path(reference: &str) -> Option<String> {
    if reference.starts_with('/') {
        return Some(reference.to_string());
    }
    Url::parse(reference).ok().map(|u| u.path().to_string())
}

fn build_metadata(detail: TemplateDetail) -> Result<TemplateMetadata, AppError> {
    let blank_path = url_path(&detail.blank)
        .ok_or_else(|| AppError::upstream(format!("malformed blank URL: {}", detail.blank)))?;

    // The blank image is served back through this service's own proxy
    // namespace, never the upstream host.
    let blank_image_path = format!("/api{}", blank_path);
    let extension = blank_path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default();

    let display_name = if detail.name.trim().is_empty() {
        detail.id.clone()
    } else {
        detail.name.clone()
    };

    Ok(TemplateMetadata {
        thumbnail_path: format!("/mini/{}", encode_id(&detail.id)),
        id: detail.id,
        display_name,
        blank_image_path,
        line_count: detail.lines,
        overlay_count: detail.overlays,
        extension,
    })
}
