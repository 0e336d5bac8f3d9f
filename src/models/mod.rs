use serde::{Deserialize, Serialize};

/// Metadata for one meme template, as mirrored from the rendering service.
///
/// Instances are owned by the catalog and never mutated after construction;
/// the catalog snapshot is replaced wholesale on invalidation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    pub id: String,
    pub display_name: String,
    pub blank_image_path: String,
    pub thumbnail_path: String,
    pub line_count: u32,
    pub overlay_count: u32,
    pub extension: String,
}

/// A shortened share link: the tag is a content address of the path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShortLink {
    pub path: String,
    pub tag: String,
}

/// An overlay blob held in the overlay store.
#[derive(Debug, Clone)]
pub struct OverlayBlob {
    pub content: Vec<u8>,
    pub mime_type: String,
}

/// One uploaded file from a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Where the template configuration comes from: a raw YAML document, or
/// structured form fields rendered into one.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    Raw(String),
    Form(TemplateForm),
}

/// Structured form input for one text region.
///
/// Values stay as strings here; they are rendered into the configuration
/// document and validated there, so malformed numbers surface as schema
/// rejections with the same reasons raw documents get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRegionForm {
    pub style: String,
    pub color: String,
    pub font: String,
    pub align: String,
    pub anchor_x: String,
    pub anchor_y: String,
    pub scale_x: String,
    pub scale_y: String,
    pub angle: String,
    pub start: String,
    pub stop: String,
}

/// Structured form input for one overlay region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRegionForm {
    pub center_x: String,
    pub center_y: String,
    pub scale: String,
    pub angle: String,
}

/// All structured form regions of an upload.
#[derive(Debug, Clone, Default)]
pub struct TemplateForm {
    pub text: Vec<TextRegionForm>,
    pub overlays: Vec<OverlayRegionForm>,
}

/// A fully assembled template upload, ready for validation.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub tag: String,
    pub long_name: String,
    pub image: Option<ImageUpload>,
    pub config: ConfigSource,
}
