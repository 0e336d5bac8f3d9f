//! Upload validation pipeline
//!
//! Turns untrusted multipart input into a new template directory. The
//! pipeline fails fast in a fixed order (tag, name, image, configuration),
//! with a distinct rejection reason at every step, and commits through a
//! staging directory published by a single atomic rename so the templates
//! root never holds a partially-written template.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::fs;
use tracing::{info, warn};

use crate::errors::{AppError, ValidationError};
use crate::models::{
    ConfigSource, ImageUpload, OverlayRegionForm, TemplateForm, TextRegionForm, UploadRequest,
};
use crate::thumbnails::is_complete_template;
use crate::utils;

pub mod schema;

const MAX_TAG_LENGTH: usize = 32;
const MAX_NAME_LENGTH: usize = 200;

pub struct UploadValidator {
    templates_dir: PathBuf,
}

impl UploadValidator {
    pub fn new(templates_dir: PathBuf) -> Self {
        Self { templates_dir }
    }

    /// Validate an upload and commit it as a new template directory.
    ///
    /// Returns the new template id. Nothing is written before every
    /// validation step has passed.
    pub async fn submit(&self, request: UploadRequest) -> Result<String, AppError> {
        self.validate_tag(&request.tag).await?;
        validate_long_name(&request.long_name)?;

        let image = request.image.as_ref().ok_or(ValidationError::ImageMissing)?;
        let extension = validate_image(image)?;

        let document = match &request.config {
            ConfigSource::Raw(raw) => {
                schema::validate_config(raw)?;
                raw.clone()
            }
            ConfigSource::Form(form) => {
                let rendered = render_form(&request.long_name, form)?;
                schema::validate_config(&rendered)?;
                rendered
            }
        };

        self.commit(&request.tag, extension, &image.bytes, &document)
            .await?;
        info!("committed new template '{}'", request.tag);
        Ok(request.tag)
    }

    async fn validate_tag(&self, tag: &str) -> Result<(), ValidationError> {
        if tag.is_empty() {
            return Err(ValidationError::TagMissing);
        }
        if tag.len() > MAX_TAG_LENGTH {
            return Err(ValidationError::TagTooLong);
        }
        if !tag.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ValidationError::TagFormat);
        }
        if is_complete_template(&self.templates_dir.join(tag)).await {
            return Err(ValidationError::TagTaken);
        }
        Ok(())
    }

    /// Stage both files, then publish the directory with one rename.
    async fn commit(
        &self,
        tag: &str,
        extension: &str,
        image: &[u8],
        document: &str,
    ) -> Result<(), AppError> {
        let staging = self.templates_dir.join(format!(".staging-{tag}"));
        if fs::try_exists(&staging).await? {
            // Leftover from a crashed attempt.
            fs::remove_dir_all(&staging).await?;
        }
        fs::create_dir_all(&staging).await?;

        let result = async {
            fs::write(staging.join(format!("default.{extension}")), image).await?;
            fs::write(staging.join("config.yml"), document).await?;

            let target = self.templates_dir.join(tag);
            if fs::rename(&staging, &target).await.is_err() {
                // The target exists. A complete template appearing since
                // validation means somebody else won the tag; an incomplete
                // directory is debris from an interrupted commit and is
                // replaced.
                if is_complete_template(&target).await {
                    return Err(AppError::Validation(ValidationError::TagTaken));
                }
                warn!("replacing incomplete template directory '{tag}'");
                fs::remove_dir_all(&target).await?;
                fs::rename(&staging, &target).await?;
            }
            Ok(())
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_dir_all(&staging).await;
        }
        result
    }
}

fn validate_long_name(long_name: &str) -> Result<(), ValidationError> {
    if long_name.trim().is_empty() {
        return Err(ValidationError::NameMissing);
    }
    if long_name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}

/// Extension spoofing alone is not enough to pass: the filename extension
/// and the sniffed content type must both be allowed and must agree.
fn validate_image(image: &ImageUpload) -> Result<&'static str, ValidationError> {
    if image.bytes.is_empty() {
        return Err(ValidationError::ImageMissing);
    }

    let extension = image
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default();
    let claimed = utils::extension_format(extension)
        .ok_or_else(|| ValidationError::ImageExtension(extension.to_string()))?;

    let sniffed =
        utils::detect_image_format(&image.bytes).ok_or(ValidationError::ImageContent)?;
    if claimed != sniffed {
        return Err(ValidationError::ImageMismatch);
    }

    Ok(utils::format_extension(sniffed))
}

/// Render structured form regions into the canonical configuration
/// document. Identical regions are de-duplicated before rendering.
pub fn render_form(name: &str, form: &TemplateForm) -> Result<String, ValidationError> {
    let mut document = String::new();
    document.push_str(&format!("name: {}\n", yaml_quote(name)?));

    document.push_str("text:\n");
    for region in dedup(&form.text) {
        document.push_str(&format!(
            "  - style: {}\n    color: {}\n    font: {}\n    align: {}\n",
            yaml_quote(&region.style)?,
            yaml_quote(&region.color)?,
            yaml_quote(&region.font)?,
            yaml_quote(&region.align)?,
        ));
        for (field, value) in [
            ("anchor_x", &region.anchor_x),
            ("anchor_y", &region.anchor_y),
            ("scale_x", &region.scale_x),
            ("scale_y", &region.scale_y),
            ("angle", &region.angle),
            ("start", &region.start),
            ("stop", &region.stop),
        ] {
            document.push_str(&format!("    {}: {}\n", field, yaml_scalar(value)?));
        }
    }

    if !form.overlays.is_empty() {
        document.push_str("overlay:\n");
        for region in dedup(&form.overlays) {
            document.push_str("  -");
            for (field, value) in [
                ("center_x", &region.center_x),
                ("center_y", &region.center_y),
                ("scale", &region.scale),
                ("angle", &region.angle),
            ] {
                document.push_str(&format!(" {}: {}\n   ", field, yaml_scalar(value)?));
            }
            // Trim the trailing continuation indent.
            while document.ends_with(' ') {
                document.pop();
            }
        }
    }

    Ok(document)
}

fn dedup<T: PartialEq + Clone>(regions: &[T]) -> Vec<T> {
    let mut seen: Vec<T> = Vec::new();
    for region in regions {
        if !seen.contains(region) {
            seen.push(region.clone());
        }
    }
    seen
}

/// Quote a form value as a YAML string, refusing anything that could break
/// out of the scalar position.
fn yaml_quote(value: &str) -> Result<String, ValidationError> {
    if value.contains('\n') || value.contains('\r') {
        return Err(ValidationError::ConfigSchema(
            "form values must be single-line".to_string(),
        ));
    }
    Ok(format!("'{}'", value.replace('\'', "''")))
}

/// Numeric form values are emitted bare so the schema's type check sees
/// them as numbers; anything non-scalar is refused here.
fn yaml_scalar(value: &str) -> Result<&str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed
            .chars()
            .any(|c| !c.is_ascii_digit() && !matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return Err(ValidationError::ConfigSchema(format!(
            "{trimmed:?} is not a number"
        )));
    }
    Ok(trimmed)
}

/// Assemble a [`TemplateForm`] from repeated multipart fields.
///
/// Field names follow the upload form's convention: `textInputAnchorX`,
/// `overlayCenterY`, and so on, each repeated once per region (a trailing
/// `[]` is tolerated). Regions are zipped index-wise; ragged field lists
/// are a schema rejection.
pub fn form_from_fields(
    fields: &HashMap<String, Vec<String>>,
) -> Result<TemplateForm, ValidationError> {
    fn get<'a>(fields: &'a HashMap<String, Vec<String>>, name: &str) -> &'a [String] {
        fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    let text_fields = [
        get(fields, "textInputStyle"),
        get(fields, "textInputColor"),
        get(fields, "textInputFont"),
        get(fields, "textInputAlign"),
        get(fields, "textInputAnchorX"),
        get(fields, "textInputAnchorY"),
        get(fields, "textInputScaleX"),
        get(fields, "textInputScaleY"),
        get(fields, "textInputAngle"),
        get(fields, "textInputStart"),
        get(fields, "textInputStop"),
    ];
    let text_count = text_fields.iter().map(|f| f.len()).max().unwrap_or(0);
    if text_fields.iter().any(|f| f.len() != text_count) {
        return Err(ValidationError::ConfigSchema(
            "text region fields are incomplete".to_string(),
        ));
    }

    let text = (0..text_count)
        .map(|i| TextRegionForm {
            style: text_fields[0][i].clone(),
            color: text_fields[1][i].clone(),
            font: text_fields[2][i].clone(),
            align: text_fields[3][i].clone(),
            anchor_x: text_fields[4][i].clone(),
            anchor_y: text_fields[5][i].clone(),
            scale_x: text_fields[6][i].clone(),
            scale_y: text_fields[7][i].clone(),
            angle: text_fields[8][i].clone(),
            start: text_fields[9][i].clone(),
            stop: text_fields[10][i].clone(),
        })
        .collect();

    let overlay_fields = [
        get(fields, "overlayCenterX"),
        get(fields, "overlayCenterY"),
        get(fields, "overlayScale"),
        get(fields, "overlayAngle"),
    ];
    let overlay_count = overlay_fields.iter().map(|f| f.len()).max().unwrap_or(0);
    if overlay_fields.iter().any(|f| f.len() != overlay_count) {
        return Err(ValidationError::ConfigSchema(
            "overlay region fields are incomplete".to_string(),
        ));
    }

    let overlays = (0..overlay_count)
        .map(|i| OverlayRegionForm {
            center_x: overlay_fields[0][i].clone(),
            center_y: overlay_fields[1][i].clone(),
            scale: overlay_fields[2][i].clone(),
            angle: overlay_fields[3][i].clone(),
        })
        .collect();

    Ok(TemplateForm { text, overlays })
}
