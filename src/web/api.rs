use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Json, Redirect},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::AppState;
use crate::content_address::decode_id;
use crate::errors::{AppError, ValidationError};
use crate::models::{
    ConfigSource, ImageUpload, ShortLink, TemplateMetadata, UploadRequest,
};
use crate::uploads::form_from_fields;
use crate::utils::sanitize_base_url;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// Template catalog API

pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<TemplateMetadata>>, StatusCode> {
    match state.catalog.list().await {
        Ok(snapshot) => {
            let mut templates: Vec<TemplateMetadata> = snapshot.values().cloned().collect();
            templates.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(Json(templates))
        }
        Err(e) => {
            error!("failed to build template catalog: {}", e);
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

// Thumbnails

pub async fn serve_thumbnail(
    Path(encoded_id): Path<String>,
    State(state): State<AppState>,
) -> Result<(HeaderMap, Vec<u8>), StatusCode> {
    let id = decode_id(&encoded_id).ok_or(StatusCode::NOT_FOUND)?;
    match state.thumbnails.fetch(&id).await {
        Ok(Some(bytes)) => {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
            Ok((headers, bytes))
        }
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("failed to materialize thumbnail for '{}': {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// Share flows

#[derive(Debug, Deserialize)]
pub struct ShortenParams {
    pub path: Option<String>,
}

pub async fn shorten(
    State(state): State<AppState>,
    Query(params): Query<ShortenParams>,
) -> Result<Json<ShortLink>, (StatusCode, Json<Value>)> {
    let raw = params.path.unwrap_or_default();
    match state.short_links.shorten(&raw) {
        Ok(link) => {
            info!("shortened {} -> {}", link.path, link.tag);
            Ok(Json(link))
        }
        Err(reason) => {
            warn!("refused to shorten {:?}: {}", raw, reason);
            Err((
                StatusCode::FORBIDDEN,
                Json(json!({ "error": reason.to_string() })),
            ))
        }
    }
}

pub async fn redirect_meme(
    Path(tag): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, StatusCode> {
    match state.short_links.resolve(&tag) {
        Some(path) => Ok(Redirect::temporary(&path)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

pub async fn store_overlay(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut bytes: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "malformed multipart body" })),
        )
    })? {
        if field.name() == Some("overlay") {
            let data = field.bytes().await.map_err(|_| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "malformed multipart body" })),
                )
            })?;
            bytes = Some(data.to_vec());
        }
    }

    let bytes = bytes.ok_or((
        StatusCode::NOT_FOUND,
        Json(json!({ "error": ValidationError::ImageMissing.to_string() })),
    ))?;

    match state.overlays.store(bytes) {
        Ok(tag) => Ok(Json(json!({ "tag": tag }))),
        Err(reason) => {
            warn!("refused overlay upload: {}", reason);
            Err((
                StatusCode::NOT_FOUND,
                Json(json!({ "error": reason.to_string() })),
            ))
        }
    }
}

pub async fn serve_overlay(
    Path(tag): Path<String>,
    State(state): State<AppState>,
) -> Result<(HeaderMap, Vec<u8>), StatusCode> {
    let blob = state.overlays.fetch(&tag).ok_or(StatusCode::NOT_FOUND)?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&blob.mime_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    Ok((headers, blob.content))
}

// Template uploads

pub async fn upload_template(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, StatusCode> {
    let mut tag = String::new();
    let mut long_name = String::new();
    let mut raw_config: Option<String> = None;
    let mut image: Option<ImageUpload> = None;
    let mut form_fields: HashMap<String, Vec<String>> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().trim_end_matches("[]").to_string();
        match name.as_str() {
            "tag" => {
                tag = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            }
            "longname" => {
                long_name = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            }
            "yml" => {
                let text = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                if !text.trim().is_empty() {
                    raw_config = Some(text);
                }
            }
            "imgInp" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                if !data.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        bytes: data.to_vec(),
                    });
                }
            }
            _ => {
                let value = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                form_fields.entry(name).or_default().push(value);
            }
        }
    }

    let config = match raw_config {
        Some(raw) => ConfigSource::Raw(raw),
        None => match form_from_fields(&form_fields) {
            Ok(form) => ConfigSource::Form(form),
            Err(reason) => return Ok(reject_upload(&reason)),
        },
    };

    let request = UploadRequest {
        tag,
        long_name,
        image,
        config,
    };

    match state.uploads.submit(request).await {
        Ok(id) => {
            // The rendering service reads the new directory directly; our
            // own catalog mirror has to be rebuilt to see it.
            state.catalog.invalidate().await;
            info!("template '{}' uploaded", id);
            Ok(Redirect::to("/"))
        }
        Err(AppError::Validation(reason)) => Ok(reject_upload(&reason)),
        Err(e) => {
            error!("template upload failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Flash-style rejection: bounce back to the upload page with the reason.
fn reject_upload(reason: &ValidationError) -> Redirect {
    warn!("refused template upload: {}", reason);
    Redirect::to(&format!(
        "/upload?message={}",
        urlencoding::encode(&reason.to_string())
    ))
}

// Upstream image proxy

pub async fn proxy_image(
    Path(path): Path<String>,
    State(state): State<AppState>,
) -> Result<(HeaderMap, Vec<u8>), StatusCode> {
    let upstream = sanitize_base_url(&state.config.upstream.url);
    let url = format!("{}/images/{}", upstream, path);

    let response = state.http.get(&url).send().await.map_err(|e| {
        error!("upstream image fetch failed for {}: {}", url, e);
        StatusCode::BAD_GATEWAY
    })?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(StatusCode::NOT_FOUND);
    }
    if !response.status().is_success() {
        error!("upstream returned {} for {}", response.status(), url);
        return Err(StatusCode::BAD_GATEWAY);
    }

    let mut headers = HeaderMap::new();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    let bytes = response.bytes().await.map_err(|e| {
        error!("upstream image body read failed for {}: {}", url, e);
        StatusCode::BAD_GATEWAY
    })?;
    Ok((headers, bytes.to_vec()))
}
