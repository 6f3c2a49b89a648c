//! Error types for image transformation operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Comprehensive error types for image transformation operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or contradictory request inputs
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Remote image could not be retrieved
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Input bytes are not a decodable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Failure inside one of the transformation stages
    #[error("Processing failed at stage '{stage}': {message}")]
    Stage { stage: String, message: String },

    /// Segmentation model loading or inference errors
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image codec errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// Coarse classification used at the request boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Fetch,
    Decode,
    Stage,
    Model,
    Config,
    Io,
}

impl PipelineError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new fetch error
    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new stage error
    pub fn stage<S: Into<String>, M: Into<String>>(stage: S, msg: M) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Classify the error for the request boundary
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Stage { .. } | Self::Image(_) => ErrorKind::Stage,
            Self::Model(_) => ErrorKind::Model,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the caller is at fault
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::Config)
    }

    /// HTTP status code this error surfaces as
    ///
    /// Input validation maps to 400, every other failure to a single 500.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Boundary body carrying the underlying message as detail
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: self.to_string(),
            kind: self.kind(),
        }
    }
}

/// Error body returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub kind: ErrorKind,
}
