//! Utility functions shared across the meme-front services
//!
//! - image content sniffing for upload and overlay validation
//! - base URL sanitization for the upstream rendering service

use image::ImageFormat;

/// Detect an allowed image format from magic bytes.
///
/// Only the formats the rendering service can work with are recognized;
/// anything else, including valid images of other formats, returns `None`.
/// Sniffing looks at content, never at a filename.
pub fn detect_image_format(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if data.starts_with(b"RIFF") && data.len() > 12 && &data[8..12] == b"WEBP" {
        Some(ImageFormat::WebP)
    } else {
        None
    }
}

/// Canonical mime type for a sniffed format.
pub fn format_mime(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Canonical file extension for a sniffed format.
pub fn format_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        _ => "bin",
    }
}

/// Format an allowed upload filename extension maps to, if any.
pub fn extension_format(extension: &str) -> Option<ImageFormat> {
    match extension.to_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "gif" => Some(ImageFormat::Gif),
        "webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

/// Sanitize a base URL by removing trailing slashes and ensuring a scheme.
pub fn sanitize_base_url(base_url: &str) -> String {
    let mut url = base_url.trim().to_string();

    while url.ends_with('/') {
        url.pop();
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("http://{}", url);
    }

    url
}
