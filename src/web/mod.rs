//! Web layer module
//!
//! Thin axum surface over the core services: handlers validate and decode
//! at the boundary, delegate to the catalog, stores, and upload pipeline,
//! and map errors to status codes explicitly. HTML rendering lives
//! elsewhere; this layer serves the JSON/bytes/redirect endpoints the pages
//! are built on.

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{
    catalog::TemplateCatalog, config::Config, overlays::OverlayStore,
    short_links::ShortLinkStore, thumbnails::ThumbnailCache, uploads::UploadValidator,
};

pub mod api;

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr =
            format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        let app = create_router(state);

        Ok(Self { app, addr })
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Create the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint (no auth anywhere; none exists by design)
        .route("/health", get(api::health))
        // Template catalog, the data source behind the index/create pages
        .route("/api/templates", get(api::list_templates))
        // Proxy namespace for the rendering service's images; short links
        // always point inside this namespace
        .route("/api/images/*path", get(api::proxy_image))
        // Thumbnails
        .route("/mini/:encoded_id", get(api::serve_thumbnail))
        // Share flows
        .route("/shorten", get(api::shorten))
        .route("/meme/:tag", get(api::redirect_meme))
        .route("/overlay", post(api::store_overlay))
        .route("/overlay/:tag", get(api::serve_overlay))
        // Template uploads
        .route("/upload", post(api::upload_template))
        // Middleware (applied in reverse order)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<TemplateCatalog>,
    pub short_links: Arc<ShortLinkStore>,
    pub overlays: Arc<OverlayStore>,
    pub thumbnails: Arc<ThumbnailCache>,
    pub uploads: Arc<UploadValidator>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Wire up all services from a configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let catalog = Arc::new(TemplateCatalog::new(&config.upstream.url)?);
        let short_links = Arc::new(ShortLinkStore::new(
            config.cache.short_link_capacity,
            std::time::Duration::from_secs(config.cache.short_link_ttl_days * 24 * 60 * 60),
        ));
        let overlays = Arc::new(OverlayStore::new(config.cache.overlay_capacity));
        let thumbnails = Arc::new(ThumbnailCache::new(
            config.storage.templates_path.clone(),
            config.cache.thumbnail_max_dimension,
            config.cache.thumbnail_quality,
        ));
        let uploads = Arc::new(UploadValidator::new(config.storage.templates_path.clone()));

        Ok(Self {
            config,
            catalog,
            short_links,
            overlays,
            thumbnails,
            uploads,
            http: reqwest::Client::new(),
        })
    }
}
