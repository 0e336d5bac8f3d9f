use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::io::Cursor;
use tower::ServiceExt;

use meme_front::config::Config;
use meme_front::web::{create_router, AppState};

fn test_state(templates_dir: &std::path::Path) -> AppState {
    let mut config = Config::default();
    config.storage.templates_path = templates_dir.to_path_buf();
    AppState::from_config(config).unwrap()
}

fn test_router(templates_dir: &std::path::Path) -> Router {
    create_router(test_state(templates_dir))
}

async fn send_request(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

const BOUNDARY: &str = "test-boundary-7MA4YWxk";

struct MultipartBody {
    data: Vec<u8>,
}

impl MultipartBody {
    fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.data.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.data.extend_from_slice(bytes);
        self.data.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.data
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.data
    }
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_fn(32, 32, |x, y| image::Rgb([x as u8, y as u8, 7]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());
    let (status, json) = send_request(&app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn shorten_returns_path_and_tag() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, json) =
        send_request(&app, Method::GET, "/shorten?path=/api/images/doge/wow.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["path"], "/api/images/doge/wow.png");
    let tag = json["tag"].as_str().unwrap().to_string();
    assert!(!tag.is_empty());

    // Idempotent across requests.
    let (_, json_again) =
        send_request(&app, Method::GET, "/shorten?path=/api/images/doge/wow.png").await;
    assert_eq!(json_again["tag"], tag.as_str());
}

#[tokio::test]
async fn shorten_refuses_paths_outside_the_image_namespace() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, json) = send_request(&app, Method::GET, "/shorten?path=/etc/passwd").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["error"].as_str().unwrap().contains("namespace"));

    let (status, _) =
        send_request(&app, Method::GET, "/shorten?path=/api/images/%2e%2e/x.png").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn meme_redirects_to_stored_path() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (_, json) =
        send_request(&app, Method::GET, "/shorten?path=/api/images/fry/a/b.jpg").await;
    let tag = json["tag"].as_str().unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/meme/{tag}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/api/images/fry/a/b.jpg"
    );
}

#[tokio::test]
async fn unknown_meme_tag_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());
    let (status, _) = send_request(&app, Method::GET, "/meme/doesnotexist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn overlay_upload_and_fetch_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());
    let png = png_bytes();

    let body = MultipartBody::new()
        .file("overlay", "sticker.png", "image/png", &png)
        .finish();
    let response = app
        .clone()
        .oneshot(multipart_request("/overlay", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap();
    let tag = json["tag"].as_str().unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/overlay/{tag}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let served = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(served.as_ref(), png.as_slice());
}

#[tokio::test]
async fn overlay_rejects_non_image_payloads() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let body = MultipartBody::new()
        .file("overlay", "evil.png", "image/png", b"<script>alert(1)</script>")
        .finish();
    let response = app
        .clone()
        .oneshot(multipart_request("/overlay", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_overlay_tag_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());
    let (status, _) = send_request(&app, Method::GET, "/overlay/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn thumbnail_of_unknown_template_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    // "bm9wZQ" is the encoding of "nope"; no such template directory exists.
    let (status, _) = send_request(&app, Method::GET, "/mini/bm9wZQ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Garbage that does not decode at all is the same miss.
    let (status, _) = send_request(&app, Method::GET, "/mini/!!!").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn thumbnail_is_served_for_existing_template() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("doge");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("default.png"), png_bytes()).unwrap();
    std::fs::write(dir.join("config.yml"), "name: Doge\ntext: []\n").unwrap();

    let app = test_router(tmp.path());
    let encoded = meme_front::content_address::encode_id("doge");
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/mini/{encoded}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(image::load_from_memory(&bytes).is_ok());
}
