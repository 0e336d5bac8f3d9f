//! Error type definitions for the meme-front application
//!
//! Two layers: `ValidationError` carries one distinct variant per rejection
//! reason so every refused request surfaces a human-readable cause, and
//! `AppError` is the umbrella over validation, lookup, upstream, and storage
//! failures.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Input rejected by a validation rule; never mutates state
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown template, tag, or overlay; reported as a benign not-found
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Rendering service unreachable or returned a malformed payload
    #[error("upstream error: {message}")]
    Upstream { message: String },

    /// Filesystem failure during commit or thumbnail generation
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl AppError {
    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>>(resource: R) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an upstream error with a custom message
    pub fn upstream<M: Into<String>>(message: M) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }
}

/// One variant per rejection reason.
///
/// The `Display` text is what callers see, so messages describe the rule
/// that failed rather than internal state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("path is not valid percent-encoded UTF-8")]
    MalformedEncoding,

    #[error("path contains forbidden character {0:?}")]
    ForbiddenCharacter(char),

    #[error("path contains a traversal sequence")]
    PathTraversal,

    #[error("path is outside the allowed image namespace")]
    PrefixNotAllowed,

    #[error("tag must not be empty")]
    TagMissing,

    #[error("tag is too long")]
    TagTooLong,

    #[error("tag may only contain lowercase ASCII letters")]
    TagFormat,

    #[error("a template with this tag already exists")]
    TagTaken,

    #[error("a name is required")]
    NameMissing,

    #[error("name is too long")]
    NameTooLong,

    #[error("an image file is required")]
    ImageMissing,

    #[error("image extension {0:?} is not allowed")]
    ImageExtension(String),

    #[error("image content is not an allowed image type")]
    ImageContent,

    #[error("image extension does not match its content")]
    ImageMismatch,

    #[error("configuration is not valid YAML: {0}")]
    ConfigSyntax(String),

    #[error("configuration is invalid: {0}")]
    ConfigSchema(String),
}
