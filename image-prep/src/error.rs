//! Error kinds raised by the preparation pipeline.
//!
//! The pipeline returns [anyhow::Error] with context attached. The typed
//! kinds below can be recovered with `downcast_ref`. I/O failures are kept
//! as [std::io::Error] or the Parquet/Arrow error types.

use thiserror::Error;

/// The image bytes cannot be decoded.
#[derive(Debug, Error)]
#[error("failed to decode image")]
pub struct DecodeError {
    #[from]
    source: image::ImageError,
}

/// The path does not follow the `.../<int>.<name>/<file>` convention.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to parse label from '{path}': {reason}")]
pub struct LabelParseError {
    pub path: String,
    pub reason: LabelParseReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelParseReason {
    #[error("expect at least 2 path segments")]
    TooFewPathSegments,
    #[error("expect at least 2 dot-separated parts in '{0}'")]
    TooFewDotSegments(String),
    #[error("'{0}' is not a valid integer")]
    InvalidInteger(String),
}

/// Invalid or missing configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("'{0}' must not be empty")]
    EmptyPath(&'static str),
    #[error("'{0}' must be positive")]
    NonPositive(&'static str),
    #[error("invalid split weights: {0}")]
    InvalidSplit(String),
    #[error("invalid table name '{0}'")]
    InvalidTableName(String),
}
