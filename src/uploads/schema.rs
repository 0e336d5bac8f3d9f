//! Declarative validation of template configuration documents
//!
//! The document schema is data: each region kind carries a table of string
//! fields and a table of numeric fields with their allowed ranges, and one
//! generic walker applies them. Adding a field or widening a range is a
//! table edit, not new control flow.

use serde_yaml::Value;

use crate::errors::ValidationError;

struct NumField {
    name: &'static str,
    min: f64,
    max: f64,
}

const TEXT_STR_FIELDS: &[&str] = &["style", "color", "font", "align"];

const TEXT_NUM_FIELDS: &[NumField] = &[
    NumField { name: "anchor_x", min: 0.0, max: 1.0 },
    NumField { name: "anchor_y", min: 0.0, max: 1.0 },
    NumField { name: "scale_x", min: 0.0, max: 1.0 },
    NumField { name: "scale_y", min: 0.0, max: 1.0 },
    NumField { name: "start", min: 0.0, max: 1.0 },
    NumField { name: "stop", min: 0.0, max: 1.0 },
    NumField { name: "angle", min: -181.0, max: 181.0 },
];

const OVERLAY_NUM_FIELDS: &[NumField] = &[
    NumField { name: "center_x", min: 0.0, max: 1.0 },
    NumField { name: "center_y", min: 0.0, max: 1.0 },
    NumField { name: "scale", min: 0.0, max: 1.0 },
    NumField { name: "angle", min: -181.0, max: 181.0 },
];

/// Parse and validate a configuration document.
pub fn validate_config(document: &str) -> Result<(), ValidationError> {
    let root: Value = serde_yaml::from_str(document)
        .map_err(|e| ValidationError::ConfigSyntax(e.to_string()))?;

    if !root.is_mapping() {
        return Err(schema_error("document must be a mapping"));
    }

    match root.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => {}
        _ => return Err(schema_error("a non-empty 'name' is required")),
    }

    let text = root
        .get("text")
        .and_then(Value::as_sequence)
        .ok_or_else(|| schema_error("a 'text' region list is required"))?;
    if text.is_empty() {
        return Err(schema_error("at least one text region is required"));
    }
    for (index, region) in text.iter().enumerate() {
        validate_region("text", index, region, TEXT_STR_FIELDS, TEXT_NUM_FIELDS)?;
    }

    if let Some(overlay) = root.get("overlay") {
        let overlay = overlay
            .as_sequence()
            .ok_or_else(|| schema_error("'overlay' must be a list"))?;
        for (index, region) in overlay.iter().enumerate() {
            validate_region("overlay", index, region, &[], OVERLAY_NUM_FIELDS)?;
        }
    }

    if let Some(example) = root.get("example") {
        let example = example
            .as_sequence()
            .ok_or_else(|| schema_error("'example' must be a list"))?;
        for entry in example {
            if !entry.is_string() {
                return Err(schema_error("'example' entries must be strings"));
            }
        }
    }

    Ok(())
}

fn validate_region(
    kind: &str,
    index: usize,
    region: &Value,
    str_fields: &[&str],
    num_fields: &[NumField],
) -> Result<(), ValidationError> {
    if !region.is_mapping() {
        return Err(schema_error(format!("{kind}[{index}] must be a mapping")));
    }

    for field in str_fields {
        match region.get(field).and_then(Value::as_str) {
            Some(value) if !value.is_empty() => {}
            _ => {
                return Err(schema_error(format!(
                    "{kind}[{index}].{field} must be a non-empty string"
                )))
            }
        }
    }

    for field in num_fields {
        let value = region
            .get(field.name)
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                schema_error(format!("{kind}[{index}].{} must be a number", field.name))
            })?;
        if value < field.min || value > field.max {
            return Err(schema_error(format!(
                "{kind}[{index}].{} must be between {} and {}",
                field.name, field.min, field.max
            )));
        }
    }

    Ok(())
}

fn schema_error(message: impl Into<String>) -> ValidationError {
    ValidationError::ConfigSchema(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name: Doge
text:
  - style: upper
    color: white
    font: thick
    align: center
    anchor_x: 0.1
    anchor_y: 0.1
    scale_x: 0.8
    scale_y: 0.2
    angle: 0.5
    start: 0.0
    stop: 1.0
"#;

    #[test]
    fn accepts_minimal_valid_document() {
        assert_eq!(validate_config(VALID), Ok(()));
    }

    #[test]
    fn accepts_optional_overlay_and_example() {
        let doc = format!(
            "{VALID}overlay:\n  - center_x: 0.5\n    center_y: 0.5\n    scale: 0.25\n    angle: -90\nexample:\n  - top line\n  - bottom line\n"
        );
        assert_eq!(validate_config(&doc), Ok(()));
    }

    #[test]
    fn rejects_invalid_yaml() {
        assert!(matches!(
            validate_config("name: [unterminated"),
            Err(ValidationError::ConfigSyntax(_))
        ));
    }

    #[test]
    fn rejects_missing_name() {
        let doc = VALID.replace("name: Doge", "name: '   '");
        assert!(matches!(
            validate_config(&doc),
            Err(ValidationError::ConfigSchema(_))
        ));
    }

    #[test]
    fn rejects_missing_text_regions() {
        assert!(matches!(
            validate_config("name: Doge\ntext: []\n"),
            Err(ValidationError::ConfigSchema(_))
        ));
        assert!(matches!(
            validate_config("name: Doge\n"),
            Err(ValidationError::ConfigSchema(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_fields() {
        for (field, bad) in [
            ("anchor_x: 0.1", "anchor_x: 1.5"),
            ("scale_y: 0.2", "scale_y: -0.1"),
            ("angle: 0.5", "angle: 200"),
            ("stop: 1.0", "stop: 2.0"),
        ] {
            let doc = VALID.replace(field, bad);
            let err = validate_config(&doc).unwrap_err();
            assert!(
                matches!(err, ValidationError::ConfigSchema(_)),
                "{bad} should be out of range, got {err:?}"
            );
        }
    }

    #[test]
    fn angle_range_is_wider_than_unit_fields() {
        let doc = VALID.replace("angle: 0.5", "angle: -180");
        assert_eq!(validate_config(&doc), Ok(()));
    }

    #[test]
    fn rejects_non_numeric_values() {
        let doc = VALID.replace("anchor_x: 0.1", "anchor_x: wide");
        assert!(matches!(
            validate_config(&doc),
            Err(ValidationError::ConfigSchema(_))
        ));
    }

    #[test]
    fn rejects_missing_string_field() {
        let doc = VALID.replace("    font: thick\n", "");
        assert!(matches!(
            validate_config(&doc),
            Err(ValidationError::ConfigSchema(_))
        ));
    }

    #[test]
    fn rejects_overlay_out_of_range() {
        let doc = format!("{VALID}overlay:\n  - center_x: 1.5\n    center_y: 0.5\n    scale: 0.2\n    angle: 0\n");
        assert!(matches!(
            validate_config(&doc),
            Err(ValidationError::ConfigSchema(_))
        ));
    }
}
